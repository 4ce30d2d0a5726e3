//! Password protection with fine-grained permissions for existing PDF documents.
//!
//! A [`PermissionPolicy`] decides seven capabilities (comments, copy,
//! accessibility, edit, fill, print, sign). The policy is encoded either as a
//! named [`CapabilitySet`] or as a legacy [`PermissionBits`] mask, depending
//! on what the PDF engine offers, and handed to the engine through a
//! [`Ladder`] of encryption calls that degrades gracefully on engines with
//! older call signatures.
//!
//! PDF permissions are advisory: compliant readers honour them, but they are
//! not a cryptographic guarantee.
//!
//! ```no_run
//! use pdfprotect::{protect_document, Permission, PermissionPolicy};
//!
//! let policy = PermissionPolicy::default().with(Permission::Copy, true);
//! let report = protect_document("report.pdf", "protected_report.pdf", "", "owner-secret", &policy)?;
//! assert!(report.permissions_applied());
//! # Ok::<(), pdfprotect::Error>(())
//! ```

mod bitmask;
pub use bitmask::{BitLayout, PermissionBits};

mod capability;
pub use capability::{CapabilityCode, CapabilitySet, Vocabulary};

mod encoder;
pub use encoder::{to_bitmask, to_capability_set};

pub mod engine;
pub use engine::{DocumentWriter, EncryptCall, PdfEngine, SourceDocument};
#[cfg(feature = "lopdf-engine")]
pub use engine::LopdfEngine;

mod error;
pub use error::{EngineError, Error, Result};

pub mod ladder;
pub use ladder::{Ladder, Rung};

mod options;
pub use options::{EncryptionStrength, ProtectOptions, ProtectOptionsBuilder};

mod policy;
pub use policy::{Permission, PermissionPolicy, PermissionPolicyBuilder};

mod probe;
pub use probe::{CapabilityProbe, EngineCapabilityShape, detect_shape};

mod protector;
pub use protector::{ProtectReport, Protector};

pub mod validator;

#[cfg(feature = "lopdf-engine")]
use std::path::Path;

/// Writes an encrypted copy of `source` to `destination` using the lopdf
/// engine and default [`ProtectOptions`].
#[cfg(feature = "lopdf-engine")]
pub fn protect_document<S, D>(
    source: S, destination: D, user_password: &str, owner_password: &str, policy: &PermissionPolicy,
) -> Result<ProtectReport>
where
    S: AsRef<Path>,
    D: AsRef<Path>,
{
    Protector::new(LopdfEngine::default()).protect(
        source.as_ref(),
        destination.as_ref(),
        user_password,
        owner_password,
        policy,
    )
}

/// Whether `path` opens as a PDF with the lopdf engine.
#[cfg(feature = "lopdf-engine")]
pub fn is_valid_pdf<P: AsRef<Path>>(path: P) -> bool {
    validator::is_valid_pdf(&LopdfEngine::default(), path.as_ref())
}
