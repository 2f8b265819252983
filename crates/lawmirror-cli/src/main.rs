//! lawmirror - mirror of the gesetze-im-internet.de law catalog
//!
//! Converts every published law to JSON (whole document plus one file per
//! paragraph), writes only what changed, and commits the data directory
//! when something did.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lawmirror_core::{ProgressContext, Verbosity};

mod cmd;
mod config;
mod publish;

use config::Config;

#[derive(Parser)]
#[command(name = "lawmirror")]
#[command(about = "Mirror German federal law into change-tracked JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./lawmirror.toml or ~/.config/lawmirror/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read timeout in seconds for stall detection
    #[arg(long, global = true)]
    read_timeout: Option<u64>,

    /// Maximum retries for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all laws, rebuild the index, publish changes
    Sync(cmd::sync::SyncArgs),
    /// Rebuild index.json from the data directory
    Index(cmd::index::IndexArgs),
    /// Show what the data directory holds
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(ProgressContext::new());

    // TTY: warn unless --debug, bars show activity. Non-TTY: info.
    let is_tty = progress.is_tty();
    let multi = is_tty.then(|| progress.multi());
    lawmirror_core::init_logging(Verbosity::for_terminal(is_tty, cli.debug), multi)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    let http = config.http.resolve(cli.read_timeout, cli.max_retries);

    match cli.command {
        Command::Sync(args) => cmd::sync::run(args, &config, http, &progress),
        Command::Index(args) => cmd::index::run(args, &config),
        Command::Status(args) => cmd::status::run(args, &config),
        Command::Config => {
            cmd::print_summary(
                "Setting",
                &[
                    ("Output directory", config.output.dir.display().to_string()),
                    ("TOC URL", config.source.toc_url.clone()),
                    ("Archive suffix", config.source.archive_suffix.clone()),
                    (
                        "Workers",
                        format!("{} (max: {})", config.workers.default, config.workers.max),
                    ),
                    ("Connect timeout", format!("{}s", http.connect_timeout.as_secs())),
                    ("Read timeout", format!("{}s", http.read_timeout.as_secs())),
                    ("Max retries", http.max_retries.to_string()),
                    ("Base delay", format!("{}ms", http.base_delay.as_millis())),
                    ("Fail on empty run", config.run.fail_on_empty.to_string()),
                    ("Index base URL", config.index.base_url.clone()),
                    (
                        "Publish",
                        match (config.publish.enabled, config.publish.push) {
                            (false, _) => "disabled".to_string(),
                            (true, false) => "commit".to_string(),
                            (true, true) => format!("commit + push to {}", config.publish.remote),
                        },
                    ),
                ],
            );
            Ok(())
        }
    }
}
