//! Error types for document API calls

/// Errors from authenticated API requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Token acquisition or refresh failed; carries the auth error unchanged.
    #[error(transparent)]
    Auth(#[from] keeper_auth::Error),

    /// Network or transport failure talking to the document API.
    #[error("request failed: {0}")]
    Transport(String),

    /// The token is still expired and this call already spent its refresh.
    #[error("too many refresh attempts")]
    TooManyRefreshAttempts,

    /// The API answered with an `error` payload or an error status.
    #[error("remote API error (HTTP {status}): {body}")]
    RemoteApi { status: u16, body: serde_json::Value },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
