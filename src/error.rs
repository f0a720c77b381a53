//! Error types for the cache engine.

use std::io;

/// Error returned by a caller-supplied render routine.
///
/// Producers are free to fail with any error type. A failed production is
/// never cached and is always surfaced to the caller that ran it.
pub type ProduceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during cache operations.
///
/// Disk failures are recoverable: [`RenderGate`](crate::RenderGate) treats a
/// failed disk read as a cache miss and falls back to production, so a broken
/// disk tier degrades performance, not correctness.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error from the disk tier
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The caller-supplied producer failed; nothing was cached
    #[error("render production failed: {0}")]
    Produce(ProduceError),
}
