use thiserror::Error;

/// Errors raised by the cache itself rather than by a fetcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache entry {key} holds a value of a different type")]
    TypeMismatch { key: String },

    /// The fetch task panicked or was cancelled before producing a result.
    #[error("Fetch for {key} was aborted")]
    FetchAborted { key: String },
}
