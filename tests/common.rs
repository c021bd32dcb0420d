#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use authsession::client::AuthServiceClient;
use authsession::config::SessionConfig;
use authsession::errors::AuthError;
use authsession::models::{LoginResponse, MfaChallenge, MfaSecret, SessionState, TokenPair};
use authsession::session::SessionManager;
use authsession::storage::{ClientStorage, MemoryStorage};
use tokio::sync::Semaphore;

/// An `AuthServiceClient` whose answers are queued up by the test.
///
/// Unscripted refreshes are rejected the way a real service rejects a missing or
/// unknown refresh token. Every call is recorded by name.
#[derive(Default)]
pub struct MockAuthClient {
    calls: Mutex<Vec<String>>,
    login_responses: Mutex<VecDeque<Result<LoginResponse, AuthError>>>,
    refresh_responses: Mutex<VecDeque<Result<TokenPair, AuthError>>>,
    mfa_responses: Mutex<VecDeque<Result<TokenPair, AuthError>>>,
    logout_error: Mutex<Option<AuthError>>,
    refresh_tokens_seen: Mutex<Vec<Option<String>>>,
    login_cookie_flags: Mutex<Vec<bool>>,
    refresh_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockAuthClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_login(&self, response: Result<LoginResponse, AuthError>) {
        self.login_responses.lock().unwrap().push_back(response);
    }

    pub fn push_login_tokens(&self, jwt: &str, refresh: Option<&str>) {
        self.push_login(Ok(LoginResponse::Tokens(TokenPair::new(
            jwt,
            refresh.map(str::to_string),
        ))));
    }

    pub fn push_login_mfa(&self, ticket: &str) {
        self.push_login(Ok(LoginResponse::MfaRequired(MfaChallenge {
            mfa: true,
            ticket: ticket.to_string(),
        })));
    }

    pub fn push_refresh(&self, response: Result<TokenPair, AuthError>) {
        self.refresh_responses.lock().unwrap().push_back(response);
    }

    pub fn push_refresh_tokens(&self, jwt: &str, refresh: Option<&str>) {
        self.push_refresh(Ok(TokenPair::new(jwt, refresh.map(str::to_string))));
    }

    pub fn push_mfa(&self, response: Result<TokenPair, AuthError>) {
        self.mfa_responses.lock().unwrap().push_back(response);
    }

    pub fn fail_logout(&self, error: AuthError) {
        *self.logout_error.lock().unwrap() = Some(error);
    }

    /// Make every following refresh wait for a permit on the returned semaphore.
    pub fn gate_refresh(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.refresh_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| *call == name).count()
    }

    pub fn refresh_tokens_seen(&self) -> Vec<Option<String>> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }

    pub fn login_cookie_flags(&self) -> Vec<bool> {
        self.login_cookie_flags.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl AuthServiceClient for MockAuthClient {
    async fn register(&self, email: &str, _password: &str) -> Result<(), AuthError> {
        self.record("register");
        if email.contains('@') {
            Ok(())
        } else {
            Err(AuthError::Validation(format!("invalid email '{}'", email)))
        }
    }

    async fn login(
        &self,
        _email: &str,
        _password: &str,
        wants_cookie: bool,
    ) -> Result<LoginResponse, AuthError> {
        self.record("login");
        self.login_cookie_flags.lock().unwrap().push(wants_cookie);
        self.login_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Authentication("wrong credentials".into())))
    }

    async fn logout(&self, _refresh_token: Option<&str>, _all: bool) -> Result<(), AuthError> {
        self.record("logout");
        match self.logout_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn refresh_token(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        self.record("refresh");
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.map(str::to_string));

        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.refresh_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Authentication("invalid refresh token".into())))
    }

    async fn activate(&self, _ticket: &str) -> Result<(), AuthError> {
        self.record("activate");
        Ok(())
    }

    async fn change_email(&self, _new_email: &str) -> Result<(), AuthError> {
        self.record("change_email");
        Ok(())
    }

    async fn request_email_change(&self, _new_email: &str) -> Result<(), AuthError> {
        self.record("request_email_change");
        Ok(())
    }

    async fn confirm_email_change(&self, _ticket: &str) -> Result<(), AuthError> {
        self.record("confirm_email_change");
        Ok(())
    }

    async fn change_password(
        &self,
        _old_password: &str,
        _new_password: &str,
        bearer_token: &str,
    ) -> Result<(), AuthError> {
        self.record(&format!("change_password:{}", bearer_token));
        Ok(())
    }

    async fn request_password_change(&self, _email: &str) -> Result<(), AuthError> {
        self.record("request_password_change");
        Ok(())
    }

    async fn confirm_password_change(
        &self,
        _new_password: &str,
        _ticket: &str,
    ) -> Result<(), AuthError> {
        self.record("confirm_password_change");
        Ok(())
    }

    async fn generate_mfa_secret(&self, bearer_token: &str) -> Result<MfaSecret, AuthError> {
        self.record(&format!("generate_mfa:{}", bearer_token));
        Ok(MfaSecret {
            image_url: "data:image/png;base64,AAAA".to_string(),
            otp_secret: "OTPSECRET".to_string(),
        })
    }

    async fn enable_mfa(&self, _code: &str, bearer_token: &str) -> Result<(), AuthError> {
        self.record(&format!("enable_mfa:{}", bearer_token));
        Ok(())
    }

    async fn disable_mfa(&self, _code: &str, bearer_token: &str) -> Result<(), AuthError> {
        self.record(&format!("disable_mfa:{}", bearer_token));
        Ok(())
    }

    async fn verify_mfa_totp(&self, _code: &str, _ticket: &str) -> Result<TokenPair, AuthError> {
        self.record("verify_mfa");
        self.mfa_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Authentication("invalid code".into())))
    }
}

/// Collects every state a listener was told about.
#[derive(Clone, Default)]
pub struct Recorder {
    states: Arc<Mutex<Vec<SessionState>>>,
}

impl Recorder {
    pub fn attach(manager: &SessionManager) -> Self {
        let recorder = Recorder::default();
        let states = recorder.states.clone();
        manager.on_state_changed(move |state: SessionState| states.lock().unwrap().push(state));
        recorder
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().unwrap().clone()
    }
}

pub fn session_config(use_cookies: bool) -> SessionConfig {
    SessionConfig {
        use_cookies,
        refresh_interval: Duration::from_secs(30),
        ..SessionConfig::default()
    }
}

pub fn build_manager(
    client: Arc<MockAuthClient>,
    storage: Arc<MemoryStorage>,
    use_cookies: bool,
) -> SessionManager {
    SessionManager::new(session_config(use_cookies), client, storage)
}

pub fn stored_refresh_token(storage: &MemoryStorage) -> Option<String> {
    storage.get("refresh_token").expect("memory storage never fails")
}
