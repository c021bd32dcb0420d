use async_trait::async_trait;

use crate::errors::AuthError;
use crate::models::{LoginResponse, MfaSecret, TokenPair};

/// Remote operations offered by the auth service.
///
/// Every call is network-bound and fails with a classified `AuthError`.
/// Calls that act on behalf of a signed-in user take the bearer token explicitly.
#[async_trait]
pub trait AuthServiceClient: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// `wants_cookie` asks the server to keep the refresh token in a cookie
    /// instead of returning it in the body.
    async fn login(
        &self,
        email: &str,
        password: &str,
        wants_cookie: bool,
    ) -> Result<LoginResponse, AuthError>;

    /// `all` invalidates every session of the user rather than only this one.
    async fn logout(&self, refresh_token: Option<&str>, all: bool) -> Result<(), AuthError>;

    async fn refresh_token(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError>;

    async fn activate(&self, ticket: &str) -> Result<(), AuthError>;

    async fn change_email(&self, new_email: &str) -> Result<(), AuthError>;

    async fn request_email_change(&self, new_email: &str) -> Result<(), AuthError>;

    async fn confirm_email_change(&self, ticket: &str) -> Result<(), AuthError>;

    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        bearer_token: &str,
    ) -> Result<(), AuthError>;

    async fn request_password_change(&self, email: &str) -> Result<(), AuthError>;

    async fn confirm_password_change(
        &self,
        new_password: &str,
        ticket: &str,
    ) -> Result<(), AuthError>;

    async fn generate_mfa_secret(&self, bearer_token: &str) -> Result<MfaSecret, AuthError>;

    async fn enable_mfa(&self, code: &str, bearer_token: &str) -> Result<(), AuthError>;

    async fn disable_mfa(&self, code: &str, bearer_token: &str) -> Result<(), AuthError>;

    async fn verify_mfa_totp(&self, code: &str, ticket: &str) -> Result<TokenPair, AuthError>;
}
