use std::path::Path;

use log::debug;

use crate::engine::{PdfEngine, SourceDocument};
use crate::{Error, Result};

/// Opens `path` and touches its first page, returning the page count.
///
/// Some readers only fail once a page is actually resolved, so opening alone
/// is not enough.
pub fn validate_pdf<E: PdfEngine + ?Sized>(engine: &E, path: &Path) -> Result<usize> {
    let unreadable = |source| Error::UnreadableDocument {
        path: path.to_path_buf(),
        source,
    };
    let document = engine.open(path).map_err(unreadable)?;
    let page_count = document.page_count();
    if page_count > 0 {
        document.page(0).map_err(unreadable)?;
    }
    Ok(page_count)
}

/// Whether `path` is a PDF the engine can read.
pub fn is_valid_pdf<E: PdfEngine + ?Sized>(engine: &E, path: &Path) -> bool {
    match validate_pdf(engine, path) {
        Ok(_) => true,
        Err(err) => {
            debug!("{err}");
            false
        }
    }
}
