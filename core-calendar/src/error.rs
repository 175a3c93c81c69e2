use bridge_traits::error::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Temporary failure: {0}")]
    Transient(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Stored calendar document is malformed: {0}")]
    Decode(String),

    #[error("Calendar was modified concurrently; gave up after {attempts} attempts")]
    WriteConflict { attempts: u32 },

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Coarse classification for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Transient,
    Storage,
    Decode,
    WriteConflict,
    InvalidEvent,
}

impl ErrorKind {
    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "Your session has expired. Please sign in again.",
            ErrorKind::Transient => "The calendar service is unreachable right now. Please try again.",
            ErrorKind::Storage => "The calendar could not be saved or loaded.",
            ErrorKind::Decode => "The stored calendar is damaged and could not be read.",
            ErrorKind::WriteConflict => {
                "Your change may conflict with another device. Please retry."
            }
            ErrorKind::InvalidEvent => "The event is missing required information.",
        }
    }
}

impl CalendarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalendarError::Auth(_) => ErrorKind::Auth,
            CalendarError::Transient(_) => ErrorKind::Transient,
            CalendarError::Storage(_) => ErrorKind::Storage,
            CalendarError::Decode(_) => ErrorKind::Decode,
            CalendarError::WriteConflict { .. } => ErrorKind::WriteConflict,
            CalendarError::InvalidEvent(_) => ErrorKind::InvalidEvent,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CalendarError::Transient(_) | CalendarError::WriteConflict { .. }
        )
    }
}

impl From<BridgeError> for CalendarError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Unauthorized { .. } => CalendarError::Auth(error.to_string()),
            BridgeError::Timeout(_) | BridgeError::Network(_) | BridgeError::Unavailable { .. } => {
                CalendarError::Transient(error.to_string())
            }
            BridgeError::PreconditionFailed { .. } => CalendarError::WriteConflict { attempts: 1 },
            other => CalendarError::Storage(other.to_string()),
        }
    }
}

impl From<AuthError> for CalendarError {
    fn from(error: AuthError) -> Self {
        CalendarError::Auth(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CalendarError>;
