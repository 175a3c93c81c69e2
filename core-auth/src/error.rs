use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Access token expired")]
    TokenExpired,

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Token refresh timed out after {0} seconds")]
    RefreshTimeout(u64),
}

pub type Result<T> = std::result::Result<T, AuthError>;
