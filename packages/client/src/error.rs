// ABOUTME: Error types for backend requests and turn orchestration
// ABOUTME: Transport failures are terminal per turn, never retried

use ragline_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("a message is already streaming for this conversation")]
    TurnInFlight,

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ClientResult<T> = Result<T, ClientError>;
