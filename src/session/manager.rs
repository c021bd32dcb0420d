use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::listener::{notify_all, ListenerId, ListenerRegistry, StateListener};
use super::token_holder::TokenHolder;
use crate::client::AuthServiceClient;
use crate::config::SessionConfig;
use crate::errors::AuthError;
use crate::models::{AuthOutcome, LoginResponse, MfaSecret, SessionState, TokenPair};
use crate::storage::{ClientStorage, REFRESH_TOKEN_KEY};
use crate::utils::log_throttle::LogThrottle;

const REFRESH_FAILED_LOG_KEY: &str = "session.refresh.failed";
const REFRESH_FAILED_LOG_WINDOW: Duration = Duration::from_secs(300);

/// Keeps a client-side authentication session alive.
///
/// The manager owns the session state machine: it installs access tokens, persists
/// the refresh token, runs a periodic background refresh while authenticated and
/// tells listeners about every transition.
///
/// Creating a manager immediately probes for an existing session by refreshing with
/// whatever refresh token is in storage, so it must be created inside a tokio runtime.
/// Handles are cheap to clone; the refresh timer stops once the last one is dropped.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    client: Arc<dyn AuthServiceClient>,
    storage: Arc<dyn ClientStorage>,
    session: Mutex<Session>,
    listeners: Mutex<ListenerRegistry>,
    /// Last state handed to listeners. Held for the whole delivery so deliveries
    /// never interleave.
    delivered: Mutex<SessionState>,
    state_tx: watch::Sender<SessionState>,
    refresh_in_flight: AtomicBool,
    log_throttle: LogThrottle,
}

struct Session {
    state: SessionState,
    tokens: TokenHolder,
    /// Armed exactly while `state` is `Authenticated`.
    refresh_timer: Option<JoinHandle<()>>,
    /// Bumped on every login and logout. A refresh issued under an older epoch
    /// is discarded when it completes.
    epoch: u64,
}

/// Clears the in-flight flag even if the refresh future is dropped mid-flight.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        client: Arc<dyn AuthServiceClient>,
        storage: Arc<dyn ClientStorage>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unknown);
        let auto_login = config.auto_login;
        let inner = Arc::new(Inner {
            config,
            client,
            storage,
            session: Mutex::new(Session {
                state: SessionState::Unknown,
                tokens: TokenHolder::new(),
                refresh_timer: None,
                epoch: 0,
            }),
            listeners: Mutex::new(ListenerRegistry::default()),
            delivered: Mutex::new(SessionState::Unknown),
            state_tx,
            refresh_in_flight: AtomicBool::new(false),
            log_throttle: LogThrottle::new(REFRESH_FAILED_LOG_WINDOW),
        });

        if !inner.config.use_cookies && !inner.storage.is_enabled() {
            warn!("Client storage is disabled; the session will not survive a restart");
        }

        if auto_login {
            debug!("Probing for an existing session");
            let probe = inner.clone();
            tokio::spawn(async move { probe.refresh().await });
        } else {
            inner.set_state(false, None);
        }

        SessionManager { inner }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.inner.client.register(email, password).await
    }

    /// Sign in with email and password.
    ///
    /// Accounts with a second factor get `AuthOutcome::MfaRequired` back and stay
    /// signed out until `verify_mfa` succeeds.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        let response = self
            .inner
            .client
            .login(email, password, self.inner.config.use_cookies)
            .await?;

        match response {
            LoginResponse::MfaRequired(challenge) => {
                info!("Login requires a second factor");
                Ok(AuthOutcome::MfaRequired(challenge))
            }
            LoginResponse::Tokens(pair) => {
                self.inner.establish(pair);
                info!("Logged in");
                Ok(AuthOutcome::Authenticated)
            }
        }
    }

    /// End the session. `all` also invalidates the user's sessions elsewhere.
    ///
    /// The remote call is best-effort: local session material is always cleared.
    pub async fn logout(&self, all: bool) {
        let inner = &self.inner;
        let refresh_token = {
            let mut session = inner.session();
            session.epoch += 1;
            if let Some(timer) = session.refresh_timer.take() {
                timer.abort();
            }
            inner.stored_refresh_token()
        };

        if let Err(e) = inner.client.logout(refresh_token.as_deref(), all).await {
            warn!("Remote logout failed, clearing the local session anyway: {}", e);
        }

        let changed = {
            let mut session = inner.session();
            // Anything issued while the remote logout was pending is stale too.
            session.epoch += 1;
            inner.remove_refresh_token();
            inner.transition_locked(&mut session, false, None)
        };
        if changed {
            inner.notify();
        }
        info!(all, "Logged out");
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// This is what the background timer runs. Failures are never returned; they
    /// show up as a transition to `Unauthenticated`.
    pub async fn refresh(&self) {
        self.inner.refresh().await
    }

    /// Current state; `Unknown` until the initial probe resolves.
    pub fn state(&self) -> SessionState {
        self.inner.session().state
    }

    /// Resolves once the state has left `Unknown`.
    pub async fn wait_until_resolved(&self) -> SessionState {
        let mut rx = self.inner.state_tx.subscribe();
        let resolved = rx.wait_for(|state| state.is_resolved()).await.map(|s| *s);
        resolved.unwrap_or_else(|_| self.state())
    }

    pub fn access_token(&self) -> Result<String, AuthError> {
        self.inner.session().tokens.get()
    }

    pub fn claim(&self, name: &str) -> Result<Value, AuthError> {
        let namespace = self.inner.config.claims_namespace.as_deref();
        self.inner.session().tokens.claim(name, namespace)
    }

    /// Register a listener for future transitions. It is not called with the current state.
    pub fn on_state_changed<L>(&self, listener: L) -> ListenerId
    where
        L: StateListener + 'static,
    {
        self.inner.listeners().add(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners().remove(id)
    }

    pub async fn activate(&self, ticket: &str) -> Result<(), AuthError> {
        self.inner.client.activate(ticket).await
    }

    pub async fn change_email(&self, new_email: &str) -> Result<(), AuthError> {
        self.inner.client.change_email(new_email).await
    }

    pub async fn request_email_change(&self, new_email: &str) -> Result<(), AuthError> {
        self.inner.client.request_email_change(new_email).await
    }

    pub async fn confirm_email_change(&self, ticket: &str) -> Result<(), AuthError> {
        self.inner.client.confirm_email_change(ticket).await
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let token = self.access_token()?;
        self.inner
            .client
            .change_password(old_password, new_password, &token)
            .await
    }

    pub async fn request_password_change(&self, email: &str) -> Result<(), AuthError> {
        self.inner.client.request_password_change(email).await
    }

    pub async fn confirm_password_change(
        &self,
        new_password: &str,
        ticket: &str,
    ) -> Result<(), AuthError> {
        self.inner
            .client
            .confirm_password_change(new_password, ticket)
            .await
    }

    pub async fn generate_mfa(&self) -> Result<MfaSecret, AuthError> {
        let token = self.access_token()?;
        self.inner.client.generate_mfa_secret(&token).await
    }

    pub async fn enable_mfa(&self, code: &str) -> Result<(), AuthError> {
        let token = self.access_token()?;
        self.inner.client.enable_mfa(code, &token).await
    }

    pub async fn disable_mfa(&self, code: &str) -> Result<(), AuthError> {
        let token = self.access_token()?;
        self.inner.client.disable_mfa(code, &token).await
    }

    /// Complete a login that returned `AuthOutcome::MfaRequired`.
    pub async fn verify_mfa(&self, code: &str, ticket: &str) -> Result<(), AuthError> {
        let pair = self.inner.client.verify_mfa_totp(code, ticket).await?;
        self.inner.establish(pair);
        info!("Logged in with a second factor");
        Ok(())
    }

    #[cfg(test)]
    fn timer_armed(&self) -> bool {
        self.inner.session().refresh_timer.is_some()
    }
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        // Critical sections never leave the session half-updated.
        match self.session.lock() {
            Ok(session) => session,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn stored_refresh_token(&self) -> Option<String> {
        if self.config.use_cookies {
            return None;
        }
        match self.storage.get(REFRESH_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to read refresh token from client storage: {}", e);
                None
            }
        }
    }

    fn persist_refresh_token(&self, refresh_token: Option<&str>) {
        if self.config.use_cookies {
            return;
        }
        let Some(token) = refresh_token else {
            warn!("Auth service returned no refresh token; the session will not survive a restart");
            return;
        };
        if let Err(e) = self.storage.set(REFRESH_TOKEN_KEY, token) {
            warn!("Failed to persist refresh token: {}", e);
        }
    }

    fn remove_refresh_token(&self) {
        if self.config.use_cookies {
            return;
        }
        if let Err(e) = self.storage.remove(REFRESH_TOKEN_KEY) {
            warn!("Failed to remove refresh token from client storage: {}", e);
        }
    }

    fn set_state(self: &Arc<Self>, authenticated: bool, access_token: Option<&str>) {
        let changed = {
            let mut session = self.session();
            self.transition_locked(&mut session, authenticated, access_token)
        };
        if changed {
            self.notify();
        }
    }

    /// Apply a transition while the session lock is held.
    ///
    /// The token is installed before anything else so listeners observing the new
    /// state also observe the new token. Returns whether the state changed; the
    /// caller must call `notify` after releasing the lock.
    fn transition_locked(
        self: &Arc<Self>,
        session: &mut Session,
        authenticated: bool,
        access_token: Option<&str>,
    ) -> bool {
        if let Some(token) = access_token {
            session.tokens.set(token);
        }
        if !authenticated {
            session.tokens.clear();
        }

        let target = SessionState::from_authenticated(authenticated);
        if session.state == target {
            return false;
        }

        debug!(from = %session.state, to = %target, "Session state transition");
        session.state = target;
        if authenticated {
            if let Some(stale) = session.refresh_timer.take() {
                stale.abort();
            }
            session.refresh_timer = Some(spawn_refresh_timer(
                Arc::downgrade(self),
                self.config.refresh_interval,
            ));
        } else if let Some(timer) = session.refresh_timer.take() {
            timer.abort();
        }
        self.state_tx.send_replace(target);
        true
    }

    /// Deliver the current state to listeners unless it is the one they last saw.
    ///
    /// Deliveries are serialized and always report the state as of delivery, so
    /// transitions racing on different threads may be coalesced but never reach
    /// listeners out of order. Lock order is `delivered` then `session`.
    fn notify(&self) {
        let mut delivered = match self.delivered.lock() {
            Ok(delivered) => delivered,
            Err(poisoned) => poisoned.into_inner(),
        };
        let state = self.session().state;
        if *delivered == state {
            return;
        }
        *delivered = state;

        let listeners = self.listeners().snapshot();
        info!(state = %state, listeners = listeners.len(), "Session state changed");
        notify_all(&listeners, state);
    }

    /// Install a freshly issued token pair from a login or MFA verification.
    fn establish(self: &Arc<Self>, pair: TokenPair) {
        let changed = {
            let mut session = self.session();
            session.epoch += 1;
            self.persist_refresh_token(pair.refresh_token.as_deref());
            self.transition_locked(&mut session, true, Some(&pair.jwt_token))
        };
        self.log_throttle.reset(REFRESH_FAILED_LOG_KEY);
        if changed {
            self.notify();
        }
    }

    async fn refresh(self: &Arc<Self>) {
        if self.refresh_in_flight.swap(true, Ordering::SeqCst) {
            debug!("A refresh is already in flight, skipping");
            return;
        }
        let _guard = InFlightGuard(&self.refresh_in_flight);

        let (epoch, refresh_token) = {
            let session = self.session();
            (session.epoch, self.stored_refresh_token())
        };
        debug!("Refreshing access token");
        let result = self.client.refresh_token(refresh_token.as_deref()).await;

        let changed = {
            let mut session = self.session();
            if session.epoch != epoch {
                info!("Discarding refresh result that completed after a login or logout");
                return;
            }
            match result {
                Ok(pair) => {
                    self.persist_refresh_token(pair.refresh_token.as_deref());
                    self.log_throttle.reset(REFRESH_FAILED_LOG_KEY);
                    self.transition_locked(&mut session, true, Some(&pair.jwt_token))
                }
                Err(e) if e.is_session_fatal() => {
                    info!("Refresh token rejected, ending session: {}", e);
                    self.remove_refresh_token();
                    self.transition_locked(&mut session, false, None)
                }
                Err(e) if session.state == SessionState::Unknown => {
                    warn!("Could not reach the auth service to restore the session: {}", e);
                    self.transition_locked(&mut session, false, None)
                }
                Err(e) => {
                    if let Some(suppressed) = self.log_throttle.should_emit(REFRESH_FAILED_LOG_KEY)
                    {
                        warn!(
                            suppressed,
                            "Refresh failed, keeping the session until the next attempt: {}", e
                        );
                    }
                    false
                }
            }
        };
        if changed {
            self.notify();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = match self.session.get_mut() {
            Ok(session) => session,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(timer) = session.refresh_timer.take() {
            timer.abort();
        }
    }
}

/// Periodically refresh the session until aborted or the manager is gone.
/// The first tick fires one full period after arming.
fn spawn_refresh_timer(inner: Weak<Inner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            debug!("Refresh timer fired");
            inner.refresh().await;
        }
    })
}
