//! Keeper client bundle: one credential, its token manager and the document API

use keeper_auth::{Credentials, TokenManager};

use crate::api::DocumentApi;
use crate::executor::Executor;

/// Everything needed to talk to Keeper with one OAuth client credential.
///
/// The token manager is shared with the API, so token updates made by either
/// side (or by the proactive refresh task) are visible to both.
#[derive(Clone)]
pub struct KeeperClient {
    tokens: TokenManager,
    api: DocumentApi,
}

impl KeeperClient {
    /// Build a client around an existing token manager.
    pub fn new(tokens: TokenManager) -> Self {
        let api = DocumentApi::new(Executor::new(tokens.clone()));
        Self { tokens, api }
    }

    /// Build a client whose credential updates are reported to `listener`.
    pub fn with_listener<F>(credentials: Credentials, http_client: reqwest::Client, listener: F) -> Self
    where
        F: Fn(&Credentials) + Send + Sync + 'static,
    {
        Self::new(TokenManager::with_listener(credentials, http_client, listener))
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn api(&self) -> &DocumentApi {
        &self.api
    }
}
