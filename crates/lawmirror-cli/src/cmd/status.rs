//! Status subcommand - summarize what the data directory holds

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use lawmirror_core::fmt_num;
use lawmirror_store::Store;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Data directory
    pub dir: Option<PathBuf>,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| config.output.dir.clone());
    if !dir.is_dir() {
        anyhow::bail!("data directory not found: {}", dir.display());
    }

    let stats = Store::open(&dir).stats()?;
    print_summary(
        "Data",
        &[
            ("Directory", dir.display().to_string()),
            ("Documents", fmt_num(stats.documents)),
            ("Paragraph dirs", fmt_num(stats.paragraph_dirs)),
            ("Paragraphs", fmt_num(stats.paragraph_files)),
            ("Index", if stats.has_index { "present" } else { "missing" }.to_string()),
        ],
    );
    Ok(())
}
