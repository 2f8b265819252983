//! Archive unpacking: locate the markup payload inside a law's `xml.zip`

use std::io::{Cursor, Read};

use thiserror::Error;
use zip::ZipArchive;

/// Upper bound for pre-allocating an entry from its declared size
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("no entry ending in {extension:?} in archive")]
    NoMarkupEntry { extension: String },
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
}

/// Return the bytes of the first entry whose name ends with `extension`.
///
/// Other entries (rendering files, images) are ignored.
pub fn unpack(archive: &[u8], extension: &str) -> Result<Vec<u8>, UnpackError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| UnpackError::CorruptArchive(e.to_string()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| UnpackError::CorruptArchive(e.to_string()))?;
        if entry.is_dir() || !entry.name().ends_with(extension) {
            continue;
        }

        log::trace!("unpacking {} ({} bytes)", entry.name(), entry.size());
        let mut markup = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
        entry
            .read_to_end(&mut markup)
            .map_err(|e| UnpackError::CorruptArchive(e.to_string()))?;
        return Ok(markup);
    }

    Err(UnpackError::NoMarkupEntry {
        extension: extension.to_string(),
    })
}
