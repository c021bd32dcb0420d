use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::storage::StorageConfig;

/// Prefix for environment overrides, e.g. `AUTHSESSION_BASE_URL`.
pub const ENV_PREFIX: &str = "AUTHSESSION_";

/// Claim namespace used by Hasura-style access tokens.
pub const DEFAULT_CLAIMS_NAMESPACE: &str = "https://hasura.io/jwt/claims";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    /// Address of the backend; auth endpoints live under `{base_url}/auth`.
    pub base_url: String,
    /// Let the server keep the refresh token in an HTTP cookie instead of handing it to us.
    #[serde(default)]
    pub use_cookies: bool,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Probe for an existing session (via refresh) as soon as the manager is created.
    #[serde(default = "default_true")]
    pub auto_login: bool,
    #[serde(default = "default_claims_namespace")]
    pub claims_namespace: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_claims_namespace() -> Option<String> {
    Some(DEFAULT_CLAIMS_NAMESPACE.to_string())
}

/// The part of the configuration the session manager itself consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub use_cookies: bool,
    pub refresh_interval: Duration,
    pub auto_login: bool,
    pub claims_namespace: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            use_cookies: false,
            refresh_interval: Duration::from_secs(default_refresh_interval_secs()),
            auto_login: true,
            claims_namespace: default_claims_namespace(),
        }
    }
}

impl ConfigV1 {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            use_cookies: self.use_cookies,
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            auto_login: self.auto_login,
            claims_namespace: self.claims_namespace.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.refresh_interval_secs == 0 {
            return Err("refresh_interval_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Extract and validate a configuration from an already assembled figment.
pub fn extract_config(figment: Figment) -> Result<ConfigV1, figment::Error> {
    let config = match figment.extract::<Config>()? {
        Config::ConfigV1(c) => c,
    };
    // handle configuration migration between versions here when necessary
    config.validate().map_err(figment::Error::from)?;
    Ok(config)
}

/// Variables sharing the prefix that the binary reads itself.
const ENV_IGNORED: &[&str] = &["config", "email", "password"];

/// `AUTHSESSION_*` overrides, minus the binary's own variables so credentials
/// never end up in the figment.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).ignore(ENV_IGNORED).split("__")
}

/// Load config from a YAML file, with `AUTHSESSION_*` environment variables taking precedence.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(env_provider());
    extract_config(figment)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
