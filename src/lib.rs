//! Library exports for authsession, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod session;
pub mod storage;
pub mod utils;

pub use client::{AuthServiceClient, HttpAuthClient};
pub use errors::AuthError;
pub use models::{AuthOutcome, SessionState};
pub use session::SessionManager;
