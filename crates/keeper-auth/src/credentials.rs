//! The credential record owned by `TokenManager`
//!
//! Field names serialize in camelCase so a persisted record keeps the shape
//! callers already store (`accessToken`, `expireTime`, ...). `expire_time` is
//! an absolute unix timestamp in seconds, computed from the token endpoint's
//! `expires_in` delta at the moment the response is applied.

use common::Secret;
use serde::{Deserialize, Serialize};

use crate::claims;
use crate::constants::{DEFAULT_API_SITE, DEFAULT_AUTH_PATH, DEFAULT_AUTH_SITE, DEFAULT_TOKEN_PATH};
use crate::token::TokenResponse;

/// OAuth client configuration plus the current token state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default = "default_auth_site")]
    pub auth_site: String,
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_api_site")]
    pub api_site: String,

    pub client_id: String,
    pub client_secret: Secret<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Secret<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Seconds-to-live reported at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Expiration as unix timestamp in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

fn default_auth_site() -> String {
    DEFAULT_AUTH_SITE.to_string()
}

fn default_auth_path() -> String {
    DEFAULT_AUTH_PATH.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_api_site() -> String {
    DEFAULT_API_SITE.to_string()
}

impl Credentials {
    /// Client identity with default endpoints and no tokens yet.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            auth_site: default_auth_site(),
            auth_path: default_auth_path(),
            token_path: default_token_path(),
            api_site: default_api_site(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            access_token: None,
            refresh_token: None,
            token_type: None,
            expires_in: None,
            expire_time: None,
            display_name: None,
        }
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_ref().map(|t| t.expose().as_str())
    }

    /// Current refresh token, ignoring empty values.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_ref()
            .map(|t| t.expose().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Whether the access token must be treated as expired at `now` (unix seconds).
    ///
    /// A record that never received a token (no `expire_time`) is expired.
    /// The token is still valid during its `expire_time` second.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expire_time {
            Some(expire_time) => expire_time < now,
            None => true,
        }
    }

    /// Apply a token endpoint response received at `now` (unix seconds).
    ///
    /// `access_token` and `expire_time` are always written together. With
    /// `replace_refresh` the refresh token is overwritten even when the
    /// response omits it (code exchange); otherwise it is only replaced when
    /// the server rotates it (refresh).
    pub(crate) fn apply_token(&mut self, response: TokenResponse, now: u64, replace_refresh: bool) {
        self.display_name = Some(claims::display_name(&response.access_token));
        self.access_token = Some(Secret::new(response.access_token));
        self.expires_in = Some(response.expires_in);
        self.expire_time = Some(now.saturating_add(response.expires_in));
        self.token_type = response.token_type;
        match response.refresh_token {
            Some(refresh) => self.refresh_token = Some(Secret::new(refresh)),
            None if replace_refresh => self.refresh_token = None,
            None => {}
        }
    }
}
