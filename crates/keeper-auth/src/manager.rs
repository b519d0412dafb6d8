//! Token lifecycle owner
//!
//! `TokenManager` holds the single `Credentials` record for a client and is the
//! only writer of it. Handles are cheap clones sharing one state, so the request
//! executor and the caller observe every update. After each successful exchange
//! or refresh the full record is handed to the registered listener, which is
//! where callers persist it.
//!
//! Refreshes are single-flight: concurrent callers queue on an async mutex and
//! the ones that waited while another refresh landed reuse its result.
//!
//! The optional proactive refresh is a one-shot tokio task firing
//! `PROACTIVE_REFRESH_MARGIN_SECS` before expiry. Short-lived tokens are
//! refreshed at half-life instead, and never sooner than
//! `PROACTIVE_REFRESH_MIN_DELAY_SECS` after issuance. The task is re-armed
//! after every refresh and after a transport failure, aborted on re-arm or
//! `disable_proactive_refresh`, and holds only a weak reference so dropping
//! the last handle stops it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::authorize;
use crate::constants::{
    PROACTIVE_REFRESH_MARGIN_SECS, PROACTIVE_REFRESH_MIN_DELAY_SECS, PROACTIVE_RETRY_BACKOFF_SECS,
};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::token::{self, TokenEndpoint, TokenResponse};

/// Callback receiving the full credential record after every update.
pub type CredentialsListener = Arc<dyn Fn(&Credentials) + Send + Sync>;

/// Owns a credential record and performs its OAuth token exchanges.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    credentials: RwLock<Credentials>,
    http_client: reqwest::Client,
    listener: Option<CredentialsListener>,
    /// Bumped on every token write; lets queued refreshers detect a refresh
    /// that completed while they waited.
    generation: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
    proactive: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl TokenManager {
    /// Create a manager without an update listener.
    ///
    /// Updates are still applied in memory; a warning is logged on each one
    /// since nothing will persist them.
    pub fn new(credentials: Credentials, http_client: reqwest::Client) -> Self {
        Self::build(credentials, http_client, None)
    }

    /// Create a manager that reports every credential update to `listener`.
    pub fn with_listener<F>(credentials: Credentials, http_client: reqwest::Client, listener: F) -> Self
    where
        F: Fn(&Credentials) + Send + Sync + 'static,
    {
        Self::build(credentials, http_client, Some(Arc::new(listener)))
    }

    fn build(
        credentials: Credentials,
        http_client: reqwest::Client,
        listener: Option<CredentialsListener>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                credentials: RwLock::new(credentials),
                http_client,
                listener,
                generation: AtomicU64::new(0),
                refresh_lock: tokio::sync::Mutex::new(()),
                proactive: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the current credential record.
    pub fn credentials(&self) -> Credentials {
        self.read().clone()
    }

    /// Current access token, if one has been issued.
    pub fn access_token(&self) -> Option<String> {
        self.read().access_token().map(str::to_string)
    }

    /// Base URL of the document API.
    pub fn api_site(&self) -> String {
        self.read().api_site.clone()
    }

    /// The HTTP client used for token requests, shared with API callers.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    /// True if no expiry is known or the expiry is in the past.
    pub fn is_expired(&self) -> bool {
        self.read().is_expired_at(now_secs())
    }

    /// Authorization URL to send the resource owner's browser to.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        authorize::build_authorization_url(&self.read(), redirect_uri, state)
    }

    /// Exchange an authorization code for a token set.
    ///
    /// On success the access token, refresh token, expiry, token type and
    /// display name are written at once and the listener is notified once.
    pub async fn exchange_code(&self, redirect_uri: &str, code: &str) -> Result<Credentials> {
        let (url, client_id, client_secret) = self.endpoint_parts()?;
        let endpoint = TokenEndpoint {
            url: &url,
            client_id: &client_id,
            client_secret: &client_secret,
        };
        let response =
            token::exchange_code(&self.inner.http_client, &endpoint, redirect_uri, code).await?;

        let snapshot = self.apply(response, true);
        info!(display_name = ?snapshot.display_name, "authorization code exchanged");
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Obtain a new access token using the stored refresh token.
    ///
    /// Fails with `NoRefreshToken` before any network call when none is held.
    /// The refresh token is only replaced when the server rotates it. Re-arms
    /// the proactive timer when it is enabled.
    pub async fn refresh_access_token(&self) -> Result<Credentials> {
        let observed = self.inner.generation.load(Ordering::Acquire);
        let _guard = self.inner.refresh_lock.lock().await;
        if self.inner.generation.load(Ordering::Acquire) != observed {
            debug!("token refreshed by a concurrent caller, reusing it");
            return Ok(self.credentials());
        }

        let refresh = {
            let credentials = self.read();
            credentials.refresh_token().map(str::to_string)
        };
        let Some(refresh) = refresh else {
            warn!("unable to refresh: no refresh token");
            return Err(Error::NoRefreshToken);
        };
        let (url, client_id, client_secret) = self.endpoint_parts()?;
        let endpoint = TokenEndpoint {
            url: &url,
            client_id: &client_id,
            client_secret: &client_secret,
        };
        let response = token::refresh_token(&self.inner.http_client, &endpoint, &refresh).await?;

        let snapshot = self.apply(response, false);
        debug!(expire_time = ?snapshot.expire_time, "access token refreshed");
        self.notify(&snapshot);
        if self.inner.proactive.load(Ordering::Acquire) {
            self.arm_timer();
        }
        Ok(snapshot)
    }

    /// Refresh the token shortly before it expires, in the background.
    ///
    /// Arms a one-shot task firing `PROACTIVE_REFRESH_MARGIN_SECS` before
    /// `expire_time` (immediately if that moment has passed). Each successful
    /// refresh re-arms it; a transport failure retries after
    /// `PROACTIVE_RETRY_BACKOFF_SECS`. Failures are logged, never reported. Calling this
    /// again replaces the pending task. Must be called within a tokio runtime.
    pub fn enable_proactive_refresh(&self) {
        self.inner.proactive.store(true, Ordering::Release);
        self.arm_timer();
    }

    /// Stop proactive refresh and abort the pending task, if any.
    pub fn disable_proactive_refresh(&self) {
        self.inner.proactive.store(false, Ordering::Release);
        if let Some(handle) = self.timer_slot().take() {
            handle.abort();
            debug!("proactive refresh cancelled");
        }
    }

    /// Whether a proactive refresh task is currently scheduled.
    pub fn proactive_refresh_pending(&self) -> bool {
        self.timer_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn arm_timer(&self) {
        let (expire_time, expires_in) = {
            let credentials = self.read();
            (credentials.expire_time, credentials.expires_in)
        };
        let Some(expire_time) = expire_time else {
            debug!("no expiry known, proactive refresh not armed");
            return;
        };
        self.arm_timer_in(proactive_delay(expire_time, expires_in, now_secs()));
    }

    fn arm_timer_in(&self, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(proactive_refresh(weak, delay));

        let previous = self.timer_slot().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(delay_secs = delay.as_secs(), "proactive refresh armed");
    }

    fn apply(&self, response: TokenResponse, replace_refresh: bool) -> Credentials {
        let mut credentials = self.write();
        credentials.apply_token(response, now_secs(), replace_refresh);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        credentials.clone()
    }

    fn notify(&self, snapshot: &Credentials) {
        match &self.inner.listener {
            Some(listener) => listener(snapshot),
            None => warn!("credentials updated but no listener registered"),
        }
    }

    fn endpoint_parts(&self) -> Result<(String, String, String)> {
        let credentials = self.read();
        let url = authorize::token_url(&credentials)?;
        Ok((
            url,
            credentials.client_id.clone(),
            credentials.client_secret.expose().clone(),
        ))
    }

    fn read(&self) -> RwLockReadGuard<'_, Credentials> {
        self.inner
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Credentials> {
        self.inner
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body of the proactive refresh task.
async fn proactive_refresh(weak: Weak<Inner>, delay: Duration) {
    tokio::time::sleep(delay).await;
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let manager = TokenManager { inner };

    // Release our own slot so a failed refresh does not look pending.
    {
        let mut slot = manager.timer_slot();
        if slot
            .as_ref()
            .is_some_and(|handle| handle.id() == tokio::task::id())
        {
            slot.take();
        }
    }

    metrics::counter!("keeper_token_refresh_total", "trigger" => "proactive").increment(1);
    match manager.refresh_access_token().await {
        Ok(_) => info!("proactive token refresh succeeded"),
        Err(Error::Transport(e)) => {
            warn!(
                error = %e,
                retry_secs = PROACTIVE_RETRY_BACKOFF_SECS,
                "proactive token refresh failed, will retry"
            );
            // Unless disabled or re-armed meanwhile
            let idle = manager.timer_slot().is_none();
            if idle && manager.inner.proactive.load(Ordering::Acquire) {
                manager.arm_timer_in(Duration::from_secs(PROACTIVE_RETRY_BACKOFF_SECS));
            }
        }
        Err(e) => warn!(error = %e, "proactive token refresh failed"),
    }
}

/// Time to wait before a proactive refresh for a token expiring at `expire_time`.
///
/// Normally `PROACTIVE_REFRESH_MARGIN_SECS` before expiry. When `expires_in`
/// is known the refresh also waits for half the token's life and at least
/// `PROACTIVE_REFRESH_MIN_DELAY_SECS` past issuance, so each token is
/// refreshed at most once.
fn proactive_delay(expire_time: u64, expires_in: Option<u64>, now: u64) -> Duration {
    let mut fire_at = expire_time.saturating_sub(PROACTIVE_REFRESH_MARGIN_SECS);
    if let Some(expires_in) = expires_in {
        let issued_at = expire_time.saturating_sub(expires_in);
        fire_at = fire_at
            .max(expire_time.saturating_sub(expires_in / 2))
            .max(issued_at.saturating_add(PROACTIVE_REFRESH_MIN_DELAY_SECS));
    }
    Duration::from_secs(fire_at.saturating_sub(now))
}

/// Current unix time in seconds.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
