use std::fmt;

use serde::{Deserialize, Serialize};

/// Authentication status of the session.
///
/// `Unknown` only exists until the first refresh attempt resolves; afterwards the
/// session is always either `Authenticated` or `Unauthenticated`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    pub fn from_authenticated(authenticated: bool) -> Self {
        if authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }

    pub fn is_resolved(self) -> bool {
        self != SessionState::Unknown
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unknown => "unknown",
            SessionState::Authenticated => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
        };
        f.write_str(name)
    }
}
