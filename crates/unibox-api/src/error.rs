use thiserror::Error;

use unibox_core::RemoteError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Sync rejected: {0}")]
    SyncRejected(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ApiError> for RemoteError {
    fn from(e: ApiError) -> Self {
        RemoteError::new(e.to_string())
    }
}
