//! The client-side session: token holder, listeners and the state machine tying them together.

pub mod listener;
pub mod manager;
pub mod token_holder;

pub use listener::{ListenerId, StateListener};
pub use manager::SessionManager;
pub use token_holder::TokenHolder;
