//! Keeper OAuth defaults
//!
//! Endpoint defaults for the public Nunux Keeper deployment. Every value can be
//! overridden per credential record.

/// Keycloak site hosting the authorization and token endpoints
pub const DEFAULT_AUTH_SITE: &str = "http://login.nunux.org";

/// Authorization endpoint path (browser redirect target)
pub const DEFAULT_AUTH_PATH: &str = "/auth/realms/NunuxKeeper/protocol/openid-connect/auth";

/// Token endpoint path for code exchange and token refresh
pub const DEFAULT_TOKEN_PATH: &str = "/auth/realms/NunuxKeeper/protocol/openid-connect/token";

/// Base URL of the document API
pub const DEFAULT_API_SITE: &str = "http://api.nunux.org/keeper";

/// How long before `expireTime` the proactive refresh fires, in seconds.
pub const PROACTIVE_REFRESH_MARGIN_SECS: u64 = 60;

/// Shortest wait after issuance before a token is refreshed proactively, in
/// seconds. Tokens living less than the margin are refreshed at half-life,
/// but never sooner than this.
pub const PROACTIVE_REFRESH_MIN_DELAY_SECS: u64 = 5;

/// Wait before retrying a proactive refresh that failed in transport, in seconds.
pub const PROACTIVE_RETRY_BACKOFF_SECS: u64 = 30;

/// Display name used when the access token carries no readable claims.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";
