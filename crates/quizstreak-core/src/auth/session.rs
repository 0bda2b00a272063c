use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{bearer_headers, ApiClient, ApiError};
use crate::config::Config;
use crate::shell::AppShell;
use crate::storage::{KeyValueStore, StorageError};

use super::AuthError;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "token";

/// Shortest period the auto-refresh task accepts
const MIN_AUTO_REFRESH: Duration = Duration::from_secs(1);

type PendingRefresh = Shared<BoxFuture<'static, Result<(), String>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    api: ApiClient,
    shell: Arc<dyn AppShell>,
    token: RwLock<Option<String>>,
    refresh_in_flight: Mutex<Option<PendingRefresh>>,
    auto_refresh_interval: Duration,
}

impl Inner {
    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|t| !t.is_empty())
    }

    fn store_token(&self, token: String) -> Result<(), StorageError> {
        let result = self.store.set(TOKEN_KEY, &token);
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        result
    }

    fn clear_token(&self) -> Result<(), StorageError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.store.remove(TOKEN_KEY)
    }

    /// The one network refresh that all concurrent callers share.
    async fn run_refresh(self: Arc<Self>) -> Result<(), String> {
        let outcome = match self.current_token() {
            None => Err("no token to refresh".to_string()),
            Some(token) => match self.api.refresh(&token).await {
                Ok(fresh) => {
                    if let Err(e) = self.store_token(fresh) {
                        warn!(error = %e, "Refreshed token could not be persisted");
                    }
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            },
        };

        if let Err(ref reason) = outcome {
            warn!(reason = %reason, "Token refresh failed, logging out");
            if let Err(e) = self.clear_token() {
                warn!(error = %e, "Failed to remove token from storage");
            }
        }

        *lock(&self.refresh_in_flight) = None;
        outcome
    }
}

/// Owner of the bearer token.
///
/// Clone is cheap; clones share the token and the in-flight refresh.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Build a manager, loading any previously persisted token.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        api: ApiClient,
        shell: Arc<dyn AppShell>,
        config: &Config,
    ) -> Self {
        let token = store.get(TOKEN_KEY).filter(|t| !t.is_empty());
        debug!(has_token = token.is_some(), "Session loaded");

        Self {
            inner: Arc::new(Inner {
                store,
                api,
                shell,
                token: RwLock::new(token),
                refresh_in_flight: Mutex::new(None),
                auto_refresh_interval: config.auto_refresh_interval(),
            }),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current_token().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.current_token()
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        self.inner.store_token(token.into())
    }

    pub fn remove_token(&self) -> Result<(), StorageError> {
        self.inner.clear_token()
    }

    /// Check the token with the backend, refreshing it once on a 401.
    ///
    /// A 401 whose follow-up refresh also fails is `AuthenticationExpired`.
    pub async fn check_token(&self) -> Result<(), AuthError> {
        let token = self.token().ok_or(AuthError::NotAuthenticated)?;

        match self.inner.api.current_user(&token).await {
            Ok(()) => Ok(()),
            Err(ApiError::Unauthorized) => {
                debug!("Token rejected, attempting refresh");
                self.refresh().await.map_err(|e| {
                    debug!(error = %e, "Refresh after rejected token failed");
                    AuthError::AuthenticationExpired
                })
            }
            Err(e) => Err(AuthError::Api(e)),
        }
    }

    pub async fn verify_token(&self) -> bool {
        match self.check_token().await {
            Ok(()) => true,
            Err(AuthError::NotAuthenticated) => false,
            Err(e) if e.is_network() => {
                warn!(error = %e, "Token verification failed");
                false
            }
            Err(e) => {
                debug!(error = %e, "Token is not valid");
                false
            }
        }
    }

    /// Refresh the token. Callers arriving while a refresh is in flight wait
    /// for that one instead of sending another request.
    ///
    /// Any failure clears the token.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let pending = {
            let mut slot = lock(&self.inner.refresh_in_flight);
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = self.inner.clone().run_refresh().boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(AuthError::RefreshFailed)
    }

    pub async fn refresh_token(&self) -> bool {
        self.refresh().await.is_ok()
    }

    /// Headers for an authenticated JSON request.
    ///
    /// Fails with `NotAuthenticated` without touching the network when no
    /// token is held, and with `AuthenticationFailed` when the token could not
    /// be verified or refreshed.
    pub async fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        if !self.verify_token().await {
            return Err(AuthError::AuthenticationFailed);
        }

        // Verification may have swapped in a refreshed token
        let token = self.token().ok_or(AuthError::AuthenticationFailed)?;
        let mut headers = bearer_headers(&token)?;
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub fn handle_auth_error(&self) {
        if let Err(e) = self.remove_token() {
            warn!(error = %e, "Failed to remove token from storage");
        }
        self.inner.shell.navigate_to_login();
    }

    /// Verify a stored token at startup. Returns whether the session is usable.
    pub async fn check_auth_on_load(&self) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        if self.verify_token().await {
            true
        } else {
            info!("Stored session is no longer valid");
            self.handle_auth_error();
            false
        }
    }

    /// Spawn the periodic refresh task. It stops when the handle is cancelled
    /// or dropped.
    pub fn start_auto_refresh(&self) -> AutoRefreshHandle {
        let period = self.inner.auto_refresh_interval.max(MIN_AUTO_REFRESH);
        let session = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !session.is_authenticated() {
                    continue;
                }
                if session.refresh_token().await {
                    info!("Background token refresh succeeded");
                } else {
                    warn!("Background token refresh failed");
                }
            }
        });

        debug!(period_secs = period.as_secs(), "Auto refresh started");
        AutoRefreshHandle { task }
    }
}

/// Handle to the background refresh task.
#[derive(Debug)]
pub struct AutoRefreshHandle {
    task: JoinHandle<()>,
}

impl AutoRefreshHandle {
    pub fn cancel(self) {
        // Drop aborts the task
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AutoRefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
