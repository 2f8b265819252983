//! Change-aware atomic file writes

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::hash::{fingerprint, has_changed, short_hash};

/// Filesystem failure while persisting one output
#[derive(Debug, Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl WriteError {
    fn at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Whether a write actually touched the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: bool,
}

/// Persist `candidate` at `path` unless the file already holds the same content.
///
/// The new content goes to a temp file in the target directory which is then
/// renamed over `path`, so readers see either the old or the new file.
pub fn write_if_changed(path: &Path, candidate: &[u8]) -> Result<WriteOutcome, WriteError> {
    let existing = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(WriteError::at(path)(e)),
    };

    if !has_changed(candidate, existing.as_deref()) {
        return Ok(WriteOutcome { written: false });
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(WriteError::at(path))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(WriteError::at(path))?;
    tmp.write_all(candidate).map_err(WriteError::at(path))?;
    tmp.as_file_mut().sync_all().map_err(WriteError::at(path))?;
    tmp.persist(path).map_err(|e| WriteError::at(path)(e.error))?;

    log::debug!(
        "wrote {} ({})",
        path.display(),
        short_hash(&fingerprint(candidate))
    );
    Ok(WriteOutcome { written: true })
}
