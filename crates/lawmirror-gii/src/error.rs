//! Per-entry failure taxonomy
//!
//! Any of these aborts one catalog entry only; the runner logs it and moves on.

use lawmirror_core::FetchError;
use lawmirror_store::WriteError;
use thiserror::Error;

use crate::archive::UnpackError;
use crate::parser::ParseError;

/// Failure while processing a single catalog entry
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),
    #[error("unpack: {0}")]
    Unpack(#[from] UnpackError),
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
    /// JSON serialization of a converted document or paragraph
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Write(#[from] WriteError),
}

impl EntryError {
    /// Short stage label for log lines and summaries.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Unpack(_) => "unpack",
            Self::Parse(_) => "parse",
            Self::Encode(_) => "encode",
            Self::Write(_) => "write",
        }
    }
}
