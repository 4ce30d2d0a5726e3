use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use crate::bitmask::BitLayout;
use crate::engine::{DocumentWriter, PdfEngine, SourceDocument};
use crate::error::EngineError;
use crate::ladder::{Ladder, Rung};
use crate::policy::PermissionPolicy;
use crate::probe::{CapabilityProbe, EngineCapabilityShape};
use crate::{Error, Result};

/// Outcome of a successful [`Protector::protect`] call.
#[derive(Clone, Debug)]
pub struct ProtectReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub page_count: usize,
    /// Classification of the engine before any encryption call was made.
    pub probed_shape: EngineCapabilityShape,
    /// The ladder rung whose call the engine accepted.
    pub rung: Rung,
    pub bytes_written: usize,
}

impl ProtectReport {
    pub fn effective_shape(&self) -> EngineCapabilityShape {
        self.rung.effective_shape()
    }

    /// Whether the permission policy reached the engine. When false only the
    /// passwords were applied.
    pub fn permissions_applied(&self) -> bool {
        self.rung.applies_permissions()
    }
}

/// Produces encrypted copies of documents through an engine.
///
/// The engine is resolved before the protector is built, so a missing engine
/// fails at composition time rather than halfway through a document.
pub struct Protector<E: PdfEngine> {
    engine: E,
    probe: CapabilityProbe,
    bit_layout: BitLayout,
}

impl<E: PdfEngine> Protector<E> {
    /// Uses the engine's own bit layout for legacy masks.
    pub fn new(engine: E) -> Self {
        let bit_layout = engine.bit_layout();
        Protector {
            engine,
            probe: CapabilityProbe::new(),
            bit_layout,
        }
    }

    /// Overrides the copy bit placement used when the engine takes a bitmask.
    pub fn with_bit_layout(mut self, bit_layout: BitLayout) -> Self {
        self.bit_layout = bit_layout;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine's shape, probed on first use.
    pub fn shape(&self) -> EngineCapabilityShape {
        self.probe.shape(&self.engine)
    }

    /// Checks that `path` opens as a PDF; see [`crate::validator::validate_pdf`].
    pub fn validate(&self, path: &Path) -> Result<usize> {
        crate::validator::validate_pdf(&self.engine, path)
    }

    /// Writes an encrypted copy of `source` to `destination`.
    ///
    /// Every page of the source is copied in order. Nothing is written to
    /// `destination` unless encryption and serialization both succeed.
    pub fn protect(
        &self, source: &Path, destination: &Path, user_password: &str, owner_password: &str,
        policy: &PermissionPolicy,
    ) -> Result<ProtectReport> {
        let unreadable = |err: EngineError| Error::UnreadableDocument {
            path: source.to_path_buf(),
            source: err,
        };

        info!("Open {}", source.display());
        let reader = self.engine.open(source).map_err(unreadable)?;
        let page_count = reader.page_count();
        if page_count > 0 {
            reader.page(0).map_err(unreadable)?;
        }

        let mut writer = self.engine.create_writer(&reader);
        for index in 0..page_count {
            let page = reader.page(index).map_err(unreadable)?;
            writer.add_page(page).map_err(unreadable)?;
        }
        debug_assert_eq!(writer.page_count(), page_count);
        debug!("copied {page_count} pages");

        let probed_shape = self.shape();
        let ladder = match self.engine.vocabulary() {
            Some(vocabulary) if probed_shape.uses_named_set() => {
                Ladder::named(policy.to_capability_set(vocabulary))
            }
            _ => Ladder::bitmask(policy.to_bitmask(self.bit_layout)),
        };
        info!("Encrypt with {}", ladder.shape());
        let rung = ladder.climb(&mut writer, user_password, owner_password)?;

        let mut buffer = Vec::new();
        writer.write(&mut buffer).map_err(|err| Error::Write {
            path: destination.to_path_buf(),
            source: err,
        })?;
        drop(writer);
        drop(reader);

        info!("Save to {}", destination.display());
        persist(destination, &buffer).map_err(|err| Error::Write {
            path: destination.to_path_buf(),
            source: EngineError::Io(err),
        })?;

        let report = ProtectReport {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            page_count,
            probed_shape,
            rung,
            bytes_written: buffer.len(),
        };
        if !report.permissions_applied() {
            warn!("{} is password protected without the requested permission restrictions", destination.display());
        }
        Ok(report)
    }
}

/// Replaces `destination` with `bytes` in one step.
///
/// The bytes go to a temporary file next to the destination, which is renamed
/// over it once fully written.
fn persist(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(destination).map_err(|err| err.error)?;
    Ok(())
}
