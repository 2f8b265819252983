//! Index subcommand - rebuild index.json from persisted documents

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lawmirror_store::{Store, write_index};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Data directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Prefix for document links
    #[arg(long)]
    pub base_url: Option<String>,
}

pub fn run(args: IndexArgs, config: &Config) -> Result<()> {
    let output_dir = args.output.unwrap_or_else(|| config.output.dir.clone());
    let base_url = args.base_url.unwrap_or_else(|| config.index.base_url.clone());

    let store = Store::new(&output_dir)?;
    let (entries, outcome) = write_index(&store, &base_url)?;

    print_summary(
        "Index",
        &[
            ("Path", store.index_path().display().to_string()),
            ("Entries", entries.to_string()),
            (
                "Status",
                if outcome.written { "updated" } else { "unchanged" }.to_string(),
            ),
        ],
    );
    Ok(())
}
