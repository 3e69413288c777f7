//! Error types for the engine

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error from a remote-boundary call, carried as a message so the
/// engine does not depend on any transport crate.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for remote-boundary calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur in engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Remote call failed
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// No sync could even be attempted (e.g. missing credential)
    #[error("Sync unavailable: {0}")]
    SyncUnavailable(String),

    /// A page load failed; previously loaded pages stay intact
    #[error("Fetch failed for page {page}: {message}")]
    FetchFailed { page: usize, message: String },

    /// Remote persistence of a bulk mutation failed; the local cache
    /// has been rolled back to its pre-mutation snapshot
    #[error("Mutation failed for {count} messages: {message}")]
    MutationFailed { count: usize, message: String },
}
