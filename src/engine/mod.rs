//! Interface to the PDF engine that reads, copies, encrypts and writes documents.
//!
//! Engines do not agree on how the encryption call takes its permission data.
//! Instead of one fixed signature, [`DocumentWriter::encrypt`] receives an
//! [`EncryptCall`] naming the argument shape being attempted. An engine that
//! does not support a shape answers with [`EngineError::SignatureMismatch`] and
//! the caller moves on to the next shape.

#[cfg(feature = "lopdf-engine")]
mod lopdf_engine;
#[cfg(feature = "lopdf-engine")]
pub use lopdf_engine::{LopdfEngine, LopdfPage, LopdfSource, LopdfWriter};

use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::bitmask::{BitLayout, PermissionBits};
use crate::capability::{CapabilitySet, Vocabulary};
use crate::error::EngineError;
use crate::options::ProtectOptions;
use crate::{Error, Result};

/// A PDF engine able to open documents and produce encrypted copies.
pub trait PdfEngine {
    type Source: SourceDocument;
    type Writer: DocumentWriter<Page = <Self::Source as SourceDocument>::Page>;

    fn name(&self) -> &str;

    /// The engine's named-capability vocabulary, if it has one.
    fn vocabulary(&self) -> Option<&Vocabulary>;

    /// Where the copy permission goes when the engine takes a legacy mask.
    fn bit_layout(&self) -> BitLayout {
        BitLayout::default()
    }

    fn open(&self, path: &Path) -> std::result::Result<Self::Source, EngineError>;

    /// Creates an empty writable document for pages copied out of `source`.
    fn create_writer(&self, source: &Self::Source) -> Self::Writer;
}

/// A document opened for reading.
pub trait SourceDocument {
    type Page;

    fn page_count(&self) -> usize;

    /// Resolves page `index` (zero based), failing if the page object is broken.
    fn page(&self, index: usize) -> std::result::Result<Self::Page, EngineError>;
}

/// A document being assembled for output.
pub trait DocumentWriter {
    type Page;

    /// Appends `page` after the pages added so far.
    fn add_page(&mut self, page: Self::Page) -> std::result::Result<(), EngineError>;

    fn page_count(&self) -> usize;

    /// Applies encryption using the argument shape of `call`.
    ///
    /// A failed call leaves the writer as it was before the call.
    fn encrypt(&mut self, call: &EncryptCall<'_>) -> std::result::Result<(), EngineError>;

    fn write(&mut self, sink: &mut dyn Write) -> std::result::Result<(), EngineError>;
}

/// The argument shapes of the encryption call, from most to least specific.
#[derive(Clone, Copy)]
pub enum EncryptCall<'a> {
    /// Passwords and a named permission set, passed by name.
    NamedPermissions {
        user_password: &'a str,
        owner_password: &'a str,
        permissions: &'a CapabilitySet,
    },
    /// The same three values for engines taking them positionally.
    PositionalPermissions {
        user_password: &'a str,
        owner_password: &'a str,
        permissions: &'a CapabilitySet,
    },
    /// Passwords, key length and a legacy permission mask.
    PermissionMask {
        user_password: &'a str,
        owner_password: &'a str,
        use_128bit: bool,
        permissions: PermissionBits,
    },
    /// Passwords and key length; the engine's default permissions apply.
    KeyStrength {
        user_password: &'a str,
        owner_password: &'a str,
        use_128bit: bool,
    },
    /// Passwords only; the engine's default permissions apply.
    PasswordsOnly {
        user_password: &'a str,
        owner_password: &'a str,
    },
}

impl<'a> EncryptCall<'a> {
    pub fn user_password(&self) -> &'a str {
        match *self {
            EncryptCall::NamedPermissions { user_password, .. }
            | EncryptCall::PositionalPermissions { user_password, .. }
            | EncryptCall::PermissionMask { user_password, .. }
            | EncryptCall::KeyStrength { user_password, .. }
            | EncryptCall::PasswordsOnly { user_password, .. } => user_password,
        }
    }

    pub fn owner_password(&self) -> &'a str {
        match *self {
            EncryptCall::NamedPermissions { owner_password, .. }
            | EncryptCall::PositionalPermissions { owner_password, .. }
            | EncryptCall::PermissionMask { owner_password, .. }
            | EncryptCall::KeyStrength { owner_password, .. }
            | EncryptCall::PasswordsOnly { owner_password, .. } => owner_password,
        }
    }

    /// Whether the call carries the permission policy.
    pub fn restricts_permissions(&self) -> bool {
        matches!(
            self,
            EncryptCall::NamedPermissions { .. }
                | EncryptCall::PositionalPermissions { .. }
                | EncryptCall::PermissionMask { .. }
        )
    }
}

// Passwords are never printed.
impl fmt::Debug for EncryptCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptCall::NamedPermissions { permissions, .. } => {
                write!(f, "NamedPermissions({permissions})")
            }
            EncryptCall::PositionalPermissions { permissions, .. } => {
                write!(f, "PositionalPermissions({permissions})")
            }
            EncryptCall::PermissionMask {
                use_128bit,
                permissions,
                ..
            } => write!(f, "PermissionMask({permissions}, use_128bit={use_128bit})"),
            EncryptCall::KeyStrength { use_128bit, .. } => write!(f, "KeyStrength(use_128bit={use_128bit})"),
            EncryptCall::PasswordsOnly { .. } => f.write_str("PasswordsOnly"),
        }
    }
}

/// Engine names accepted by [`resolve`].
pub const ENGINE_NAMES: &[&str] = &["lopdf"];

/// Resolves an engine by name, failing when it is unknown or compiled out.
#[cfg(feature = "lopdf-engine")]
pub fn resolve(name: &str, options: ProtectOptions) -> Result<LopdfEngine> {
    match name {
        "lopdf" => Ok(LopdfEngine::new(options)),
        other => Err(Error::EngineUnavailable(format!(
            "unknown engine \"{other}\" (available: {})",
            ENGINE_NAMES.join(", ")
        ))),
    }
}

#[cfg(not(feature = "lopdf-engine"))]
pub fn resolve(name: &str, _options: ProtectOptions) -> Result<std::convert::Infallible> {
    Err(Error::EngineUnavailable(format!(
        "engine \"{name}\" is not compiled in; enable the `lopdf-engine` feature"
    )))
}
