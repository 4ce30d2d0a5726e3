use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

use crate::Error;

bitflags! {
    /// Granted permissions in the legacy integer encoding (the `/P` entry of a
    /// standard security handler, bit positions as in the PDF standard).
    ///
    /// Bits that are not granted stay clear; the mask is only ever built by
    /// OR-ing granted bits together.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct PermissionBits: u32 {
        /// Print the document, possibly at degraded quality unless
        /// [`PermissionBits::PRINT_HIGH`] is also set.
        const PRINT = 0x0004;

        /// Modify contents by operations other than annotations, form filling
        /// and assembly.
        const MODIFY_CONTENTS = 0x0008;

        /// Copy or otherwise extract text and graphics.
        const COPY = 0x0010;

        /// Add or modify annotations and fill form fields.
        const MODIFY_ANNOTATIONS = 0x0020;

        /// Fill existing form fields, including signature fields.
        const FILL_FORM = 0x0100;

        /// Extract content for assistive technology.
        const ACCESSIBILITY = 0x0200;

        /// Insert, rotate or delete pages.
        const ASSEMBLE = 0x0400;

        /// Print at full quality.
        const PRINT_HIGH = 0x0800;
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.bits())
    }
}

/// Where the copy permission lands in the legacy mask.
///
/// Older encoders disagree on the copy bit. [`BitLayout::Standard`] uses
/// `0x0010`, the bit assigned by the PDF standard. [`BitLayout::AnnotationAliased`]
/// reproduces encoders that used `0x0020`, in which case copying and
/// commenting can no longer be granted independently.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BitLayout {
    #[default]
    Standard,
    AnnotationAliased,
}

impl BitLayout {
    pub fn copy_bit(self) -> PermissionBits {
        match self {
            BitLayout::Standard => PermissionBits::COPY,
            BitLayout::AnnotationAliased => PermissionBits::MODIFY_ANNOTATIONS,
        }
    }
}

impl FromStr for BitLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(BitLayout::Standard),
            "annotation-aliased" | "aliased" => Ok(BitLayout::AnnotationAliased),
            _ => Err(Error::UnknownOption(s.to_string())),
        }
    }
}
