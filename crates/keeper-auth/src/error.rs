//! Error types for OAuth token operations

/// Errors from token endpoint exchanges and credential configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or transport failure talking to the token endpoint.
    #[error("token endpoint request failed: {0}")]
    Transport(String),

    /// The token endpoint answered with an explicit error payload.
    #[error("authorization server error: {0}")]
    AuthServer(serde_json::Value),

    #[error("unable to refresh: no refresh token")]
    NoRefreshToken,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("unreadable access token claims: {0}")]
    Claims(String),
}

impl Error {
    /// Server-supplied error payload, when the authorization server sent one.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Error::AuthServer(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
