use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::AuthServiceClient;
use crate::config::ConfigV1;
use crate::errors::AuthError;
use crate::models::{LoginResponse, MfaSecret, TokenPair};

/// `AuthServiceClient` speaking JSON over HTTP to `{base_url}/auth`.
///
/// The underlying client keeps a cookie jar, so cookie mode works without any
/// extra plumbing. Clone is cheap; reqwest shares the connection pool.
#[derive(Clone)]
pub struct HttpAuthClient {
    client: Client,
    auth_url: String,
}

impl HttpAuthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_url: format!("{}/auth", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &ConfigV1) -> Result<Self, AuthError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.auth_url, path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        bearer_token: Option<&str>,
    ) -> Result<Response, AuthError> {
        debug!("POST {}", path);
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::check_response(response).await
    }

    /// Turn non-success statuses into classified errors.
    async fn check_response(response: Response) -> Result<Response, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("Auth service answered {}: {}", status, body);
        Err(AuthError::from_status(status, &body))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AuthServiceClient for HttpAuthClient {
    async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.post("/register", &json!({ "email": email, "password": password }), None)
            .await?;
        Ok(())
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        wants_cookie: bool,
    ) -> Result<LoginResponse, AuthError> {
        let body = json!({ "email": email, "password": password, "cookie": wants_cookie });
        let response = self.post("/login", &body, None).await?;
        Self::parse(response).await
    }

    async fn logout(&self, refresh_token: Option<&str>, all: bool) -> Result<(), AuthError> {
        self.post(
            "/logout",
            &json!({ "all": all, "refresh_token": refresh_token }),
            None,
        )
        .await?;
        Ok(())
    }

    async fn refresh_token(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        debug!("GET /token/refresh");
        let mut request = self.client.get(self.url("/token/refresh"));
        if let Some(token) = refresh_token {
            request = request.query(&[("refresh_token", token)]);
        }
        let response = Self::check_response(request.send().await?).await?;
        Self::parse(response).await
    }

    async fn activate(&self, ticket: &str) -> Result<(), AuthError> {
        self.post("/activate", &json!({ "ticket": ticket }), None)
            .await?;
        Ok(())
    }

    async fn change_email(&self, new_email: &str) -> Result<(), AuthError> {
        self.post("/change-email", &json!({ "new_email": new_email }), None)
            .await?;
        Ok(())
    }

    async fn request_email_change(&self, new_email: &str) -> Result<(), AuthError> {
        self.post(
            "/change-email/request",
            &json!({ "new_email": new_email }),
            None,
        )
        .await?;
        Ok(())
    }

    async fn confirm_email_change(&self, ticket: &str) -> Result<(), AuthError> {
        self.post("/change-email/change", &json!({ "ticket": ticket }), None)
            .await?;
        Ok(())
    }

    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        bearer_token: &str,
    ) -> Result<(), AuthError> {
        self.post(
            "/change-password",
            &json!({ "old_password": old_password, "new_password": new_password }),
            Some(bearer_token),
        )
        .await?;
        Ok(())
    }

    async fn request_password_change(&self, email: &str) -> Result<(), AuthError> {
        self.post("/change-password/request", &json!({ "email": email }), None)
            .await?;
        Ok(())
    }

    async fn confirm_password_change(
        &self,
        new_password: &str,
        ticket: &str,
    ) -> Result<(), AuthError> {
        self.post(
            "/change-password/change",
            &json!({ "new_password": new_password, "ticket": ticket }),
            None,
        )
        .await?;
        Ok(())
    }

    async fn generate_mfa_secret(&self, bearer_token: &str) -> Result<MfaSecret, AuthError> {
        let response = self
            .post("/mfa/generate", &json!({}), Some(bearer_token))
            .await?;
        Self::parse(response).await
    }

    async fn enable_mfa(&self, code: &str, bearer_token: &str) -> Result<(), AuthError> {
        self.post("/mfa/enable", &json!({ "code": code }), Some(bearer_token))
            .await?;
        Ok(())
    }

    async fn disable_mfa(&self, code: &str, bearer_token: &str) -> Result<(), AuthError> {
        self.post("/mfa/disable", &json!({ "code": code }), Some(bearer_token))
            .await?;
        Ok(())
    }

    async fn verify_mfa_totp(&self, code: &str, ticket: &str) -> Result<TokenPair, AuthError> {
        let response = self
            .post("/mfa/totp", &json!({ "code": code, "ticket": ticket }), None)
            .await?;
        Self::parse(response).await
    }
}
