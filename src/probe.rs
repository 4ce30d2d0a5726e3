use std::fmt;
use std::sync::OnceLock;

use log::debug;

use crate::engine::PdfEngine;

/// How an engine's encryption call accepts permission data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EngineCapabilityShape {
    /// A named permission set passed by name.
    NamedSetKeyword,
    /// A legacy integer mask passed by name.
    BitmaskKeyword,
    /// Positional arguments only, without permission data.
    BitmaskPositional,
    /// Passwords only.
    PasswordOnly,
}

impl EngineCapabilityShape {
    pub fn uses_named_set(self) -> bool {
        self == EngineCapabilityShape::NamedSetKeyword
    }
}

impl fmt::Display for EngineCapabilityShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineCapabilityShape::NamedSetKeyword => "named permission set",
            EngineCapabilityShape::BitmaskKeyword => "permission bitmask",
            EngineCapabilityShape::BitmaskPositional => "positional key strength",
            EngineCapabilityShape::PasswordOnly => "passwords only",
        };
        f.write_str(name)
    }
}

/// Classifies an engine without calling its encryption entry point.
///
/// Only the presence of a named vocabulary can be known up front. Engines
/// without one are assumed to take a bitmask; the fallback ladder finds out
/// which bitmask shape actually works.
pub fn detect_shape<E: PdfEngine + ?Sized>(engine: &E) -> EngineCapabilityShape {
    if engine.vocabulary().is_some() {
        EngineCapabilityShape::NamedSetKeyword
    } else {
        EngineCapabilityShape::BitmaskKeyword
    }
}

/// Probes an engine once and remembers the answer.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    shape: OnceLock<EngineCapabilityShape>,
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape<E: PdfEngine + ?Sized>(&self, engine: &E) -> EngineCapabilityShape {
        *self.shape.get_or_init(|| {
            let shape = detect_shape(engine);
            debug!("engine {} classified as {shape}", engine.name());
            shape
        })
    }

    /// The cached classification, if the engine has been probed.
    pub fn cached(&self) -> Option<EngineCapabilityShape> {
        self.shape.get().copied()
    }
}
