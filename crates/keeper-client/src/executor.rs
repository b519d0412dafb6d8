//! Authenticated request execution with bounded refresh-and-retry
//!
//! Every call gets one reactive retry budget. Two paths may spend it:
//!
//! - pre-flight: the token is already expired before sending. The call
//!   refreshes and restarts with a budget of zero, so a second expiry or a
//!   later 401 fails the call instead of refreshing again.
//! - reactive: the API answered 401. The call refreshes, decrements the
//!   budget and sends again.
//!
//! Either way a call makes at most two API attempts, and refresh failures
//! surface to the caller unchanged.

use serde_json::Value;
use tracing::{debug, warn};

use keeper_auth::TokenManager;

use crate::error::{Error, Result};
use crate::request::{PreparedRequest, RequestDescriptor};

/// Reactive 401 retries granted to each top-level call.
pub const REACTIVE_RETRY_BUDGET: u32 = 1;

/// Executes API requests on behalf of a `TokenManager`'s credential.
#[derive(Clone)]
pub struct Executor {
    tokens: TokenManager,
    http_client: reqwest::Client,
}

/// Status and decoded body of one API attempt.
struct Reply {
    status: u16,
    body: Value,
}

impl Reply {
    /// The `error` field of a JSON object body, if set.
    fn error_payload(&self) -> Option<&Value> {
        self.body.get("error").filter(|e| !e.is_null())
    }
}

impl Executor {
    /// Executor sharing the manager's credential and HTTP client.
    pub fn new(tokens: TokenManager) -> Self {
        let http_client = tokens.http_client().clone();
        Self {
            tokens,
            http_client,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Execute one logical call, refreshing the token at most as the budget
    /// allows, and return the decoded response body.
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Value> {
        let request = descriptor.normalize();
        let mut budget = REACTIVE_RETRY_BUDGET;

        loop {
            if self.tokens.is_expired() {
                if budget == 0 {
                    warn!(url = %request.url, "too many refresh attempts");
                    return Err(Error::TooManyRefreshAttempts);
                }
                debug!(url = %request.url, "access token expired, refreshing before request");
                metrics::counter!("keeper_token_refresh_total", "trigger" => "preflight")
                    .increment(1);
                self.tokens.refresh_access_token().await?;
                budget = 0;
                continue;
            }

            let reply = self.send(&request).await?;

            if let Some(error) = reply.error_payload() {
                warn!(url = %request.url, status = reply.status, %error, "API returned an error");
                return Err(Error::RemoteApi {
                    status: reply.status,
                    body: error.clone(),
                });
            }

            if reply.status == 401 && budget > 0 {
                budget -= 1;
                warn!(url = %request.url, "401 received, refreshing the token");
                metrics::counter!("keeper_token_refresh_total", "trigger" => "unauthorized")
                    .increment(1);
                self.tokens.refresh_access_token().await?;
                continue;
            }

            if reply.status >= 400 {
                return Err(Error::RemoteApi {
                    status: reply.status,
                    body: reply.body,
                });
            }

            return Ok(reply.body);
        }
    }

    async fn send(&self, request: &PreparedRequest) -> Result<Reply> {
        let access_token = self.tokens.access_token();
        let response = request
            .builder(&self.http_client, access_token.as_deref())
            .send()
            .await
            .map_err(|e| {
                warn!(url = %request.url, error = %e, "request error");
                Error::Transport(format!("{} {} failed: {e}", request.method, request.url))
            })?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("reading response from {} failed: {e}", request.url)))?;

        metrics::counter!(
            "keeper_api_requests_total",
            "method" => request.method.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
        debug!(method = %request.method, url = %request.url, status, "API response");

        Ok(Reply {
            status,
            body: request.decode_body(&bytes),
        })
    }
}
