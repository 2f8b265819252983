//! Lawmirror Core - Common infrastructure for the law mirror pipeline
//!
//! HTTP retrieval with retry/backoff, logging, and progress reporting
//! shared by the source pipeline and the CLI.

pub mod fetch;
pub mod logging;
pub mod progress;
pub mod retry;

// Re-exports for convenience
pub use fetch::{FetchCause, FetchError, Fetcher, HttpConfig, SHARED_RUNTIME};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{RetryPolicy, Retryable, backoff_duration, retry_with_backoff};
