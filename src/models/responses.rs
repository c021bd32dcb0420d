use serde::{Deserialize, Serialize};

/// A freshly issued access token, plus the refresh token when the service hands
/// it to the client (absent in cookie mode).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub jwt_token: String,
    #[serde(default)]
    pub jwt_expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(jwt_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        TokenPair {
            jwt_token: jwt_token.into(),
            jwt_expires_in: None,
            refresh_token,
        }
    }
}

/// Issued instead of a token when the account requires a second factor.
/// The ticket is exchanged together with a TOTP code for a `TokenPair`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MfaChallenge {
    pub mfa: bool,
    pub ticket: String,
}

/// Whatever the login endpoint answered with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum LoginResponse {
    MfaRequired(MfaChallenge),
    Tokens(TokenPair),
}

/// Secret material for setting up an authenticator app.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MfaSecret {
    pub image_url: String,
    pub otp_secret: String,
}

/// Result of a login as seen by application code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    MfaRequired(MfaChallenge),
}
