use serde_json::Value;

use crate::errors::AuthError;
use crate::models::Token;

/// Holds the current access token, if any. No I/O.
#[derive(Debug, Default)]
pub struct TokenHolder {
    token: Option<Token>,
}

impl TokenHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the token wholesale; any cached claim decoding goes with the old one.
    pub fn set(&mut self, raw: &str) {
        self.token = Some(Token::new(raw));
    }

    pub fn get(&self) -> Result<String, AuthError> {
        self.token
            .as_ref()
            .map(|token| token.as_str().to_string())
            .ok_or(AuthError::NoActiveSession)
    }

    pub fn claim(&self, name: &str, namespace: Option<&str>) -> Result<Value, AuthError> {
        self.token
            .as_ref()
            .ok_or(AuthError::NoActiveSession)?
            .claim(name, namespace)
    }

    pub fn clear(&mut self) {
        self.token = None;
    }
}
