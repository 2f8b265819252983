//! Lawmirror GII - mirror of the gesetze-im-internet.de XML catalog
//!
//! Fetches the table of contents, downloads each law's `xml.zip`, converts
//! the markup to JSON, and persists the whole document plus one file per
//! paragraph, writing only what changed.
//!
//! # Example
//!
//! ```ignore
//! use lawmirror_core::ProgressContext;
//! use lawmirror_gii::{Config, run};
//!
//! let config = Config {
//!     output_dir: "data".into(),
//!     max_entries: Some(1),
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, &ProgressContext::hidden())?;
//! if summary.outcome.is_changed() {
//!     println!("{} files written", summary.files_written());
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod parser;
pub mod runner;
pub mod toc;
pub mod worker;

// Re-exports
pub use config::{Config, EmptyRunPolicy};
pub use error::EntryError;
pub use runner::{RunOutcome, Summary, run};
pub use worker::{EntryFailure, EntryOutcome};
