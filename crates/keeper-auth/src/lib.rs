//! Keeper OAuth2 token management
//!
//! Owns a single client credential and its access-token lifecycle against a
//! Keycloak realm: authorization URL construction, code exchange, refresh,
//! expiry bookkeeping and optional proactive refresh. Persistence is left to
//! the caller through the update listener.
//!
//! Credential flow:
//! 1. Caller sends the user to `TokenManager::authorization_url()`
//! 2. The redirect handler calls `TokenManager::exchange_code()` with the code
//! 3. The listener receives the new `Credentials` and stores them
//! 4. Requests check `TokenManager::is_expired()` and call
//!    `TokenManager::refresh_access_token()` when needed
//! 5. Optionally `TokenManager::enable_proactive_refresh()` keeps the token
//!    fresh in the background

pub mod authorize;
pub mod claims;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod token;

pub use authorize::{build_authorization_url, generate_state, token_url};
pub use claims::{decode_claims, display_name};
pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use manager::{CredentialsListener, TokenManager, now_secs};
pub use token::{TokenEndpoint, TokenResponse, exchange_code, refresh_token};
