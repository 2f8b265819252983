//! GII pipeline configuration

use std::path::PathBuf;

use lawmirror_core::HttpConfig;

/// What to report when the catalog loaded but no entry completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyRunPolicy {
    /// Report success with zero counts and an unchanged outcome
    #[default]
    Succeed,
    /// Treat the run as failed
    Fail,
}

/// Runtime configuration for the GII pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory (`{code}.json`, `paragraphs/`)
    pub output_dir: PathBuf,
    /// Table-of-contents feed
    pub toc_url: String,
    /// Only links ending with this are consumed
    pub archive_suffix: String,
    /// Extension of the markup entry inside each archive
    pub markup_extension: String,
    /// Parallel workers
    pub workers: usize,
    /// Maximum entries to process (for testing)
    pub max_entries: Option<usize>,
    /// Restrict the run to these short codes (empty = all)
    pub codes: Vec<String>,
    pub empty_run: EmptyRunPolicy,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            toc_url: "https://www.gesetze-im-internet.de/gii-toc.xml".to_string(),
            archive_suffix: "/xml.zip".to_string(),
            markup_extension: ".xml".to_string(),
            workers: 4,
            max_entries: None,
            codes: Vec::new(),
            empty_run: EmptyRunPolicy::default(),
            http: HttpConfig::default(),
        }
    }
}
