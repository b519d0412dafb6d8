//! Access token claims decoding
//!
//! Keeper access tokens are compact JWTs. Only the payload segment is read,
//! without signature verification: the claims feed the display name shown to
//! users and nothing else.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use crate::constants::UNKNOWN_DISPLAY_NAME;
use crate::error::{Error, Result};

/// Decode the claims of a compact `header.payload.signature` token.
///
/// A token that does not have exactly three segments yields
/// `{"email": "Unknown"}`. A three-segment token whose payload is not
/// base64url-encoded JSON object is an error.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        let mut fallback = Map::new();
        fallback.insert("email".into(), Value::String(UNKNOWN_DISPLAY_NAME.into()));
        return Ok(fallback);
    };

    let bytes = STANDARD
        .decode(normalize_base64url(payload))
        .map_err(|e| Error::Claims(format!("payload is not base64url: {e}")))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(other) => Err(Error::Claims(format!(
            "payload is not a JSON object: {other}"
        ))),
        Err(e) => Err(Error::Claims(format!("payload is not JSON: {e}"))),
    }
}

/// Display name for a token: its `email` claim, or "Unknown".
pub fn display_name(token: &str) -> String {
    match decode_claims(token) {
        Ok(claims) => claims
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_DISPLAY_NAME)
            .to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "could not decode access token claims");
            UNKNOWN_DISPLAY_NAME.to_string()
        }
    }
}

/// Convert a base64url segment to padded standard base64.
fn normalize_base64url(segment: &str) -> String {
    let mut normalized: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    normalized
}
