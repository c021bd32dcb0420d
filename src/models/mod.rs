pub mod responses;
pub mod session_state;
pub mod token;

pub use responses::{AuthOutcome, LoginResponse, MfaChallenge, MfaSecret, TokenPair};
pub use session_state::SessionState;
pub use token::Token;
