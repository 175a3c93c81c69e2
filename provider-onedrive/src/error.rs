//! Error types for OneDrive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// OneDrive provider errors
#[derive(Error, Debug)]
pub enum OneDriveError {
    /// Token missing, expired, or lacking the required scope
    #[error("Authentication required (status {status_code})")]
    AuthRequired { status_code: u16 },

    /// Item does not exist
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Item already exists and `conflictBehavior=fail` was requested
    #[error("Item already exists: {0}")]
    AlreadyExists(String),

    /// `If-Match` did not match the item's current eTag
    #[error("eTag {expected} is stale")]
    PreconditionFailed { expected: String },

    /// Throttled by Graph after the HTTP client's own retries ran out
    #[error("Throttled (status {status_code})")]
    Throttled { status_code: u16 },

    /// Graph service error
    #[error("Service unavailable (status {status_code})")]
    ServiceUnavailable { status_code: u16 },

    /// API request returned an unexpected status
    #[error("Graph API error (status {status_code}, code {code}): {message}")]
    ApiError {
        status_code: u16,
        code: String,
        message: String,
    },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for OneDrive operations
pub type Result<T> = std::result::Result<T, OneDriveError>;

impl From<OneDriveError> for BridgeError {
    fn from(error: OneDriveError) -> Self {
        match error {
            OneDriveError::AuthRequired { status_code } => BridgeError::Unauthorized {
                status: status_code,
            },
            OneDriveError::NotFound(item) => BridgeError::NotFound(item),
            OneDriveError::AlreadyExists(item) => BridgeError::AlreadyExists(item),
            OneDriveError::PreconditionFailed { expected } => {
                BridgeError::PreconditionFailed { expected }
            }
            OneDriveError::Throttled { status_code }
            | OneDriveError::ServiceUnavailable { status_code } => BridgeError::Unavailable {
                status: status_code,
            },
            OneDriveError::ApiError {
                status_code,
                code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message: format!("{}: {}", code, message),
            },
            OneDriveError::ParseError(msg) => BridgeError::InvalidResponse(msg),
            OneDriveError::Bridge(e) => e,
        }
    }
}
