use thiserror::Error;

use crate::probe::EngineCapabilityShape;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The source could not be opened, or its first page could not be accessed.
    #[error("cannot read {} as a PDF document: {source}", path.display())]
    UnreadableDocument { path: PathBuf, source: EngineError },
    /// The engine rejected the password values themselves.
    #[error("password rejected by the PDF engine: {0}")]
    Credential(String),
    /// Every rung of the fallback ladder failed for a non-credential reason.
    #[error("no encryption call accepted by the engine ({shape}, {attempts} attempts); last error: {source}")]
    EncryptionExhausted {
        shape: EngineCapabilityShape,
        attempts: usize,
        source: EngineError,
    },
    /// The encrypted document could not be saved.
    #[error("couldn't write {}: {source}", path.display())]
    Write { path: PathBuf, source: EngineError },
    /// The requested PDF engine is unknown or was not compiled in.
    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),
    /// A permission was never decided before building the policy.
    #[error("permission \"{0}\" has not been decided")]
    UndecidedPermission(&'static str),
    #[error("unknown permission \"{0}\"")]
    UnknownPermission(String),
    #[error("unknown option value \"{0}\"")]
    UnknownOption(String),
}

impl Error {
    /// Whether the failure comes from the configured passwords or permissions
    /// rather than from the document or the filesystem.
    pub fn is_settings_error(&self) -> bool {
        matches!(
            self,
            Error::Credential(_) | Error::EncryptionExhausted { .. } | Error::UndecidedPermission(_)
        )
    }
}

/// Failure classification reported by an engine backend.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine does not accept the argument shape of the call.
    #[error("call shape not supported: {0}")]
    SignatureMismatch(String),
    /// The engine rejected a password value.
    #[error("invalid password: {0}")]
    Credential(String),
    #[error("unreadable document: {0}")]
    Unreadable(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    pub fn is_credential(&self) -> bool {
        matches!(self, EngineError::Credential(_))
    }
}

#[cfg(feature = "lopdf-engine")]
impl From<lopdf::Error> for EngineError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(err) => EngineError::Io(err),
            err => EngineError::Unreadable(err.to_string()),
        }
    }
}
