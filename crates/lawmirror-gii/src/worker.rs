//! Worker for processing one catalog entry

use indicatif::ProgressBar;
use lawmirror_core::Fetcher;
use lawmirror_store::Store;
use thiserror::Error;

use crate::archive;
use crate::config::Config;
use crate::error::EntryError;
use crate::parser;
use crate::toc::CatalogEntry;

/// What one entry contributed to the store
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EntryOutcome {
    pub document_written: bool,
    pub paragraphs_total: usize,
    pub paragraphs_written: usize,
}

impl EntryOutcome {
    pub fn changed(&self) -> bool {
        self.document_written || self.paragraphs_written > 0
    }

    pub fn files_written(&self) -> usize {
        usize::from(self.document_written) + self.paragraphs_written
    }
}

/// Entry that failed part-way, with whatever it wrote before the error
#[derive(Debug, Error)]
#[error("{error}")]
pub struct EntryFailure {
    pub partial: EntryOutcome,
    pub error: EntryError,
}

impl From<EntryError> for EntryFailure {
    fn from(error: EntryError) -> Self {
        Self {
            partial: EntryOutcome::default(),
            error,
        }
    }
}

/// Fetch, unpack, extract and persist one law.
pub fn process_entry(
    entry: &CatalogEntry,
    fetcher: &Fetcher,
    store: &Store,
    config: &Config,
    pb: &ProgressBar,
) -> Result<EntryOutcome, EntryFailure> {
    pb.set_message("downloading");
    let archive = fetcher
        .fetch_with_progress(&entry.link, pb)
        .map_err(EntryError::from)?;

    pb.set_message("converting");
    persist_archive(&entry.code, &archive, store, &config.markup_extension)
}

/// Unpack and convert an archive, then write the document followed by its
/// paragraphs. Every output goes through the change check, so an unchanged
/// law leaves the store untouched.
///
/// On failure the files already written are reported in
/// [`EntryFailure::partial`].
pub fn persist_archive(
    code: &str,
    archive: &[u8],
    store: &Store,
    markup_extension: &str,
) -> Result<EntryOutcome, EntryFailure> {
    let mut outcome = EntryOutcome::default();
    match write_outputs(code, archive, store, markup_extension, &mut outcome) {
        Ok(()) => Ok(outcome),
        Err(error) => Err(EntryFailure {
            partial: outcome,
            error,
        }),
    }
}

fn write_outputs(
    code: &str,
    archive: &[u8],
    store: &Store,
    markup_extension: &str,
    outcome: &mut EntryOutcome,
) -> Result<(), EntryError> {
    let markup = archive::unpack(archive, markup_extension)?;
    let extracted = parser::extract(&markup)?;
    outcome.paragraphs_total = extracted.paragraphs.len();

    let document = serde_json::to_vec(&extracted.document)?;
    outcome.document_written = store.write_document(code, &document)?.written;

    for paragraph in &extracted.paragraphs {
        let bytes = serde_json::to_vec(paragraph)?;
        if store.write_paragraph(code, &paragraph.id, &bytes)?.written {
            outcome.paragraphs_written += 1;
        }
    }

    Ok(())
}
