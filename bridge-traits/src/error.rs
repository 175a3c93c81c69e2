use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized (status {status})")]
    Unauthorized { status: u16 },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Precondition failed: version {expected} is no longer current")]
    PreconditionFailed { expected: String },

    #[error("Service unavailable (status {status})")]
    Unavailable { status: u16 },

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BridgeError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout(_) | BridgeError::Network(_) | BridgeError::Unavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
