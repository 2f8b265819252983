//! lawmirror-store: change-aware file store for mirrored law documents
//!
//! Persists documents and paragraphs as JSON files, rewriting a file only
//! when the blake3 fingerprint of its content changes, and builds the
//! `index.json` catalog from what is on disk.

pub mod hash;
pub mod index;
pub mod layout;
pub mod writer;

pub use hash::{fingerprint, has_changed, short_hash};
pub use index::{IndexEntry, build_index, find_title, write_index};
pub use layout::{Store, StoreStats};
pub use writer::{WriteError, WriteOutcome, write_if_changed};
