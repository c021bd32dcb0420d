use std::sync::Arc;

use authsession::client::HttpAuthClient;
use authsession::config::{load_config, print_schema};
use authsession::models::{AuthOutcome, SessionState};
use authsession::session::SessionManager;
use authsession::storage::create_storage;
use authsession::utils::logger::init_logging;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Failed to print schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config_path =
        std::env::var("AUTHSESSION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration from {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let client = match HttpAuthClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create auth client: {}", e);
            std::process::exit(1);
        }
    };
    let storage = create_storage(&config.storage);

    info!("Starting session keeper for {}", config.base_url);
    let manager = SessionManager::new(config.session_config(), Arc::new(client), storage);
    manager.on_state_changed(|state: SessionState| info!(state = %state, "Session state changed"));

    let state = manager.wait_until_resolved().await;
    info!(state = %state, "Initial session probe finished");

    if !state.is_authenticated() {
        if let (Ok(email), Ok(password)) = (
            std::env::var("AUTHSESSION_EMAIL"),
            std::env::var("AUTHSESSION_PASSWORD"),
        ) {
            match manager.login(&email, &password).await {
                Ok(AuthOutcome::Authenticated) => info!("Logged in as {}", email),
                Ok(AuthOutcome::MfaRequired(_)) => {
                    warn!("Account requires a second factor; log in interactively instead")
                }
                Err(e) => error!("Login failed: {}", e),
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down session keeper");
}
