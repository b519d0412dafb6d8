//! Service-specific error types

use thiserror::Error;

/// Command-line and document action errors.
///
/// Everything the Keeper API or the token endpoint reports arrives wrapped
/// in `Api` with its payload intact.
#[derive(Error, Debug)]
pub enum Error {
    #[error("usage: {0}")]
    Usage(String),

    #[error("unknown action: {0} (expected get, post, put or delete)")]
    UnknownAction(String),

    #[error("action {0} needs a document id")]
    NoDocumentId(&'static str),

    #[error("expected a JSON document on stdin: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Api(#[from] keeper_client::Error),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_descriptive() {
        assert_eq!(
            Error::UnknownAction("patch".into()).to_string(),
            "unknown action: patch (expected get, post, put or delete)"
        );
        assert_eq!(
            Error::NoDocumentId("delete").to_string(),
            "action delete needs a document id"
        );
        assert!(Error::Usage("keeper refresh".into()).to_string().contains("keeper refresh"));
    }

    #[test]
    fn api_errors_display_transparently() {
        let inner = keeper_client::Error::TooManyRefreshAttempts;
        let expected = inner.to_string();
        let err: Error = inner.into();
        assert_eq!(err.to_string(), expected);
    }
}
