//! On-disk layout of the mirrored data
//!
//! ```text
//! {root}/
//! ├── index.json            # catalog of all documents
//! ├── {code}.json           # whole document, compact JSON
//! └── paragraphs/
//!     └── {code}/
//!         └── {id}.json     # {"id", "heading", "text"}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::writer::{WriteError, WriteOutcome, write_if_changed};

/// File name of the catalog, excluded from document scans
pub const INDEX_FILE: &str = "index.json";

const PARAGRAPH_DIR: &str = "paragraphs";

/// Counts of what is currently persisted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub paragraph_dirs: usize,
    pub paragraph_files: usize,
    pub has_index: bool,
}

/// File store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open a store at `root`, creating the directory if needed.
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create data dir: {}", root.display()))?;
        Ok(Self::open(root))
    }

    /// Open a store without touching the filesystem.
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, code: &str) -> PathBuf {
        self.root.join(format!("{code}.json"))
    }

    pub fn paragraph_dir(&self, code: &str) -> PathBuf {
        self.root.join(PARAGRAPH_DIR).join(code)
    }

    pub fn paragraph_path(&self, code: &str, id: &str) -> PathBuf {
        self.paragraph_dir(code).join(format!("{id}.json"))
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn write_document(&self, code: &str, bytes: &[u8]) -> Result<WriteOutcome, WriteError> {
        write_if_changed(&self.document_path(code), bytes)
    }

    pub fn write_paragraph(
        &self,
        code: &str,
        id: &str,
        bytes: &[u8],
    ) -> Result<WriteOutcome, WriteError> {
        write_if_changed(&self.paragraph_path(code, id), bytes)
    }

    /// Persisted document files (`{code}.json`, excluding the index), sorted by path.
    pub fn document_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!(
            "{}/*.json",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        let mut files = Vec::new();
        for entry in glob::glob(&pattern).context("invalid document glob")? {
            let path = entry.context("failed to read data dir entry")?;
            if path.file_name().is_some_and(|n| n == INDEX_FILE) {
                continue;
            }
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Count documents and paragraph files on disk.
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats {
            documents: self.document_files()?.len(),
            has_index: self.index_path().is_file(),
            ..Default::default()
        };

        let paragraphs = self.root.join(PARAGRAPH_DIR);
        if !paragraphs.is_dir() {
            return Ok(stats);
        }

        for entry in fs::read_dir(&paragraphs)
            .with_context(|| format!("failed to list {}", paragraphs.display()))?
        {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            stats.paragraph_dirs += 1;
            for file in fs::read_dir(entry.path())? {
                let file = file?;
                if file.path().extension().is_some_and(|ext| ext == "json") {
                    stats.paragraph_files += 1;
                }
            }
        }

        Ok(stats)
    }
}
