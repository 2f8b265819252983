//! Sync subcommand - mirror the catalog, rebuild the index, publish

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use lawmirror_core::{HttpConfig, SharedProgress, fmt_num};
use lawmirror_gii::EmptyRunPolicy;
use lawmirror_store::{Store, write_index};

use super::print_summary;
use crate::config::Config;
use crate::publish::{Published, publish};

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Data directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Table-of-contents URL
    #[arg(long)]
    pub toc_url: Option<String>,

    /// Only sync these codes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub codes: Vec<String>,

    /// Maximum number of entries to process
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Fail when no entry completed
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Skip rebuilding index.json
    #[arg(long)]
    pub no_index: bool,

    /// Commit (and push, if configured) when something changed
    #[arg(long, overrides_with = "no_publish")]
    pub publish: bool,

    /// Never commit, regardless of config
    #[arg(long, overrides_with = "publish")]
    pub no_publish: bool,
}

impl SyncArgs {
    /// Publish setting after applying `--publish` / `--no-publish`.
    pub fn publish_enabled(&self, configured: bool) -> bool {
        if self.publish {
            true
        } else if self.no_publish {
            false
        } else {
            configured
        }
    }
}

pub fn run(
    args: SyncArgs,
    config: &Config,
    http: HttpConfig,
    progress: &SharedProgress,
) -> Result<()> {
    let publish_enabled = args.publish_enabled(config.publish.enabled);
    let output_dir = args.output.unwrap_or_else(|| config.output.dir.clone());
    let workers = config.workers.resolve(args.workers);
    let empty_run = if args.fail_on_empty || config.run.fail_on_empty {
        EmptyRunPolicy::Fail
    } else {
        EmptyRunPolicy::Succeed
    };

    let gii_config = lawmirror_gii::Config {
        output_dir: output_dir.clone(),
        toc_url: args.toc_url.unwrap_or_else(|| config.source.toc_url.clone()),
        archive_suffix: config.source.archive_suffix.clone(),
        markup_extension: config.source.markup_extension.clone(),
        workers,
        max_entries: args.limit,
        codes: args.codes,
        empty_run,
        http,
    };

    log::info!("Syncing gesetze-im-internet.de");
    log::info!("  Output: {}", output_dir.display());

    let summary = lawmirror_gii::run(&gii_config, progress)?;

    let mut rows = vec![
        (
            "Entries",
            format!(
                "{}/{} ({} failed)",
                fmt_num(summary.completed_entries),
                fmt_num(summary.total_entries),
                fmt_num(summary.failed_entries)
            ),
        ),
        ("Documents written", fmt_num(summary.documents_written)),
        ("Paragraphs written", fmt_num(summary.paragraphs_written)),
        ("Outcome", summary.outcome.to_string()),
        ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
    ];

    if !args.no_index {
        let store = Store::new(&output_dir)?;
        let (entries, outcome) = write_index(&store, &config.index.base_url)?;
        rows.push((
            "Index",
            format!(
                "{} entries ({})",
                fmt_num(entries),
                if outcome.written { "updated" } else { "unchanged" }
            ),
        ));
    }

    let mut publish_config = config.publish.clone();
    publish_config.enabled = publish_enabled;

    let published = publish(summary.outcome, Path::new("."), &output_dir, &publish_config)?;
    rows.push((
        "Publish",
        match published {
            Published::Skipped => "skipped".to_string(),
            Published::NothingToCommit => "nothing to commit".to_string(),
            Published::Committed { message, pushed } => {
                format!("{message}{}", if pushed { " (pushed)" } else { "" })
            }
        },
    ));

    print_summary("Sync", &rows);
    Ok(())
}
