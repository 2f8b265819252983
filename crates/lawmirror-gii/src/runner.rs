//! Main runner for the GII pipeline

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use lawmirror_core::{Fetcher, ProgressContext, fmt_num};
use lawmirror_store::Store;
use rayon::prelude::*;

use crate::config::{Config, EmptyRunPolicy};
use crate::toc::{CatalogEntry, fetch_catalog};
use crate::worker::{self, EntryOutcome};

/// Whether anything in the store changed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Changed,
    Unchanged,
}

impl RunOutcome {
    pub fn is_changed(self) -> bool {
        self == Self::Changed
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Pipeline execution summary
#[derive(Debug)]
pub struct Summary {
    pub total_entries: usize,
    pub completed_entries: usize,
    pub failed_entries: usize,
    pub documents_written: usize,
    pub paragraphs_written: usize,
    pub elapsed: Duration,
    pub outcome: RunOutcome,
}

impl Summary {
    pub fn files_written(&self) -> usize {
        self.documents_written + self.paragraphs_written
    }

    /// Log summary
    pub fn log(&self) {
        log::info!("=== GII Sync Summary ===");
        log::info!(
            "Entries: {}/{} completed ({} failed)",
            fmt_num(self.completed_entries),
            fmt_num(self.total_entries),
            fmt_num(self.failed_entries)
        );
        log::info!(
            "Written: {} documents, {} paragraphs",
            fmt_num(self.documents_written),
            fmt_num(self.paragraphs_written)
        );
        log::info!("Outcome: {}", self.outcome);
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Keep entries named in the allow-list (if any), then apply the limit.
fn select_entries(entries: Vec<CatalogEntry>, config: &Config) -> Vec<CatalogEntry> {
    let wanted = |code: &str| {
        config.codes.is_empty() || config.codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    };
    let selected = entries.into_iter().filter(|e| wanted(&e.code));

    match config.max_entries {
        Some(limit) => selected.take(limit).collect(),
        None => selected.collect(),
    }
}

/// Run the GII pipeline.
///
/// Fails only if the table of contents cannot be fetched or parsed, or if
/// `EmptyRunPolicy::Fail` is set and no entry completed. Per-entry failures
/// are logged and counted.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<Summary> {
    let start = Instant::now();

    let fetcher = Fetcher::new(config.http).context("Failed to build HTTP client")?;
    let store = Store::new(&config.output_dir)?;

    log::info!("Fetching table of contents from {}", config.toc_url);
    let phase = progress.phase_line("toc");
    phase.set_message(config.toc_url.clone());
    let catalog = fetch_catalog(&fetcher, &config.toc_url, &config.archive_suffix);
    phase.finish_and_clear();
    let catalog = catalog?;
    log::info!("Found {} archives in catalog", fmt_num(catalog.len()));

    let entries = select_entries(catalog, config);
    let total_entries = entries.len();
    log::info!(
        "Processing {} entries with {} workers",
        fmt_num(total_entries),
        config.workers
    );

    let completed_counter = AtomicUsize::new(0);
    let failed_counter = AtomicUsize::new(0);
    let documents_counter = AtomicUsize::new(0);
    let paragraphs_counter = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .context("Failed to create thread pool")?;

    pool.install(|| {
        entries.par_iter().for_each(|entry| {
            let pb = progress.entry_bar(&entry.code);

            let record = |written: &EntryOutcome| {
                documents_counter
                    .fetch_add(usize::from(written.document_written), Ordering::Relaxed);
                paragraphs_counter.fetch_add(written.paragraphs_written, Ordering::Relaxed);
            };

            match worker::process_entry(entry, &fetcher, &store, config, &pb) {
                Ok(outcome) => {
                    completed_counter.fetch_add(1, Ordering::Relaxed);
                    record(&outcome);
                    log::debug!(
                        "{}: {}/{} paragraphs written{}",
                        entry.code,
                        outcome.paragraphs_written,
                        outcome.paragraphs_total,
                        if outcome.document_written {
                            ", document updated"
                        } else {
                            ""
                        }
                    );
                }
                Err(failure) => {
                    failed_counter.fetch_add(1, Ordering::Relaxed);
                    // Files written before the failure still count as changes
                    record(&failure.partial);
                    log::error!("{}: {}", entry.code, failure);
                    if failure.partial.changed() {
                        log::warn!(
                            "{}: {} file(s) written before the failure",
                            entry.code,
                            failure.partial.files_written()
                        );
                    }
                }
            }
            pb.finish_and_clear();
        });
    });

    // The pool has joined: every write is complete before the counters are read.
    let documents_written = documents_counter.load(Ordering::Relaxed);
    let paragraphs_written = paragraphs_counter.load(Ordering::Relaxed);
    let outcome = if documents_written + paragraphs_written > 0 {
        RunOutcome::Changed
    } else {
        RunOutcome::Unchanged
    };

    let summary = Summary {
        total_entries,
        completed_entries: completed_counter.load(Ordering::Relaxed),
        failed_entries: failed_counter.load(Ordering::Relaxed),
        documents_written,
        paragraphs_written,
        elapsed: start.elapsed(),
        outcome,
    };
    summary.log();

    if summary.completed_entries == 0 && config.empty_run == EmptyRunPolicy::Fail {
        anyhow::bail!(
            "no entry completed ({} of {} failed)",
            summary.failed_entries,
            summary.total_entries
        );
    }

    Ok(summary)
}
