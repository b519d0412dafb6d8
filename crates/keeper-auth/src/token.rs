//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (initial OAuth flow completion)
//! 2. Token refresh (proactive and request-time refresh)
//!
//! Both operations POST a form-encoded body to the realm's token endpoint with
//! different grant types. The endpoint answers with either a token set or an
//! `{error, error_description}` payload; the latter is surfaced unchanged as
//! `Error::AuthServer`.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time. The caller
/// converts it to an absolute unix timestamp when applying the response.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only present on exchange and when the server rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Token endpoint location and client identity used for both grants.
#[derive(Debug)]
pub struct TokenEndpoint<'a> {
    pub url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Exchange an authorization code for tokens (initial OAuth flow).
///
/// `redirect_uri` must be the same value that was sent in the authorization
/// URL, the server compares them.
pub async fn exchange_code(
    client: &reqwest::Client,
    endpoint: &TokenEndpoint<'_>,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenResponse> {
    let result = post_form(
        client,
        endpoint.url,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", endpoint.client_id),
            ("client_secret", endpoint.client_secret),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await;
    record_outcome("authorization_code", &result);
    if let Err(e) = &result {
        warn!(error = %e, "unable to get token");
    }
    result
}

/// Obtain a new access token with a refresh token.
pub async fn refresh_token(
    client: &reqwest::Client,
    endpoint: &TokenEndpoint<'_>,
    refresh: &str,
) -> Result<TokenResponse> {
    let result = post_form(
        client,
        endpoint.url,
        &[
            ("grant_type", "refresh_token"),
            ("client_id", endpoint.client_id),
            ("client_secret", endpoint.client_secret),
            ("refresh_token", refresh),
        ],
    )
    .await;
    record_outcome("refresh_token", &result);
    if let Err(e) = &result {
        warn!(error = %e, "unable to refresh token");
    }
    result
}

async fn post_form(
    client: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| Error::Transport(format!("token request to {url} failed: {e}")))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Transport(format!("reading token response failed: {e}")))?;

    parse_token_reply(status, &body)
}

/// Interpret a token endpoint reply.
///
/// An `error` field wins over the status code. A non-success status without
/// a JSON payload is reported as an auth server error carrying the raw body.
fn parse_token_reply(status: StatusCode, body: &[u8]) -> Result<TokenResponse> {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) if status.is_success() => {
            return Err(Error::InvalidResponse(format!("body is not JSON: {e}")));
        }
        Err(_) => {
            return Err(Error::AuthServer(serde_json::json!({
                "error": status.as_u16(),
                "error_description": String::from_utf8_lossy(body),
            })));
        }
    };

    let has_error = value.get("error").is_some_and(|e| !e.is_null());
    if has_error || !status.is_success() {
        return Err(Error::AuthServer(value));
    }

    serde_json::from_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))
}

fn record_outcome(grant_type: &'static str, result: &Result<TokenResponse>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(Error::AuthServer(_)) => "rejected",
        Err(_) => "failed",
    };
    metrics::counter!("keeper_token_requests_total", "grant_type" => grant_type, "outcome" => outcome)
        .increment(1);
}
