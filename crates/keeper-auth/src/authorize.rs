//! Authorization endpoint URLs and CSRF state
//!
//! The authorization URL is where the resource owner's browser is sent to
//! grant access. The opaque `state` travels through the redirect unchanged and
//! lets the callback handler match the response to the request it issued.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use url::Url;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Build the authorization URL for the code flow.
///
/// Scheme, host and port come from `auth_site`; the path is `auth_path`. The
/// query carries `response_type=code`, `client_id`, `state` and
/// `redirect_uri` in that order, so equal inputs give byte-identical URLs.
pub fn build_authorization_url(
    credentials: &Credentials,
    redirect_uri: &str,
    state: &str,
) -> Result<String> {
    let mut url = site_url(&credentials.auth_site, &credentials.auth_path)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &credentials.client_id)
        .append_pair("state", state)
        .append_pair("redirect_uri", redirect_uri);
    Ok(url.into())
}

/// Token endpoint URL: `auth_site` origin joined with `token_path`.
pub fn token_url(credentials: &Credentials) -> Result<String> {
    site_url(&credentials.auth_site, &credentials.token_path).map(Into::into)
}

/// Generate a random CSRF `state` value.
///
/// 18 random bytes encoded as URL-safe base64 without padding (24 chars), safe
/// to embed in a query string or a cookie as-is.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 18];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn site_url(site: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(site)
        .map_err(|e| Error::InvalidConfig(format!("auth site {site:?} is not a valid URL: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidConfig(format!(
            "auth site {site:?} cannot carry a path"
        )));
    }
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
