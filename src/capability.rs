use std::collections::BTreeSet;
use std::fmt;

/// A permission token in an engine's named-capability vocabulary.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CapabilityCode {
    Print,
    PrintHighRes,
    ModifyContents,
    ModifyAnnotations,
    Copy,
    Accessibility,
    FillForm,
    Assemble,
}

impl CapabilityCode {
    pub const ALL: [CapabilityCode; 8] = [
        CapabilityCode::Print,
        CapabilityCode::PrintHighRes,
        CapabilityCode::ModifyContents,
        CapabilityCode::ModifyAnnotations,
        CapabilityCode::Copy,
        CapabilityCode::Accessibility,
        CapabilityCode::FillForm,
        CapabilityCode::Assemble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CapabilityCode::Print => "PRINT",
            CapabilityCode::PrintHighRes => "PRINT_HIGH_RES",
            CapabilityCode::ModifyContents => "MODIFY_CONTENTS",
            CapabilityCode::ModifyAnnotations => "MODIFY_ANNOTATIONS",
            CapabilityCode::Copy => "COPY",
            CapabilityCode::Accessibility => "ACCESSIBILITY",
            CapabilityCode::FillForm => "FILL_FORM",
            CapabilityCode::Assemble => "ASSEMBLE",
        }
    }
}

impl fmt::Display for CapabilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The capability codes an engine knows about.
///
/// Engines differ in which codes they define, so membership is always checked
/// against the vocabulary the engine reports instead of assumed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Vocabulary {
    codes: BTreeSet<CapabilityCode>,
}

impl Vocabulary {
    pub fn new<I: IntoIterator<Item = CapabilityCode>>(codes: I) -> Self {
        Vocabulary {
            codes: codes.into_iter().collect(),
        }
    }

    /// A vocabulary defining every code in [`CapabilityCode::ALL`].
    pub fn complete() -> Self {
        Self::new(CapabilityCode::ALL)
    }

    pub fn contains(&self, code: CapabilityCode) -> bool {
        self.codes.contains(&code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityCode> + '_ {
        self.codes.iter().copied()
    }
}

/// The capability codes granted to a document.
///
/// An empty set grants nothing. It never means "unrestricted".
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CapabilitySet {
    codes: BTreeSet<CapabilityCode>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: CapabilityCode) -> bool {
        self.codes.insert(code)
    }

    pub fn contains(&self, code: CapabilityCode) -> bool {
        self.codes.contains(&code)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityCode> + '_ {
        self.codes.iter().copied()
    }

    pub fn is_subset(&self, other: &CapabilitySet) -> bool {
        self.codes.is_subset(&other.codes)
    }
}

impl FromIterator<CapabilityCode> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityCode>>(iter: I) -> Self {
        CapabilitySet {
            codes: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.codes.is_empty() {
            return f.write_str("{}");
        }
        let names: Vec<&str> = self.iter().map(CapabilityCode::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
