use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the refresh token is persisted between runs.
/// We differentiate the backends via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema, Default)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Lives as long as the process; nothing survives a restart.
    #[default]
    #[serde(rename = "memory")]
    Memory,
    /// A JSON document on disk.
    #[serde(rename = "file")]
    File { path: PathBuf },
    /// Writes are dropped and reads are empty (server-side rendering, cookie-only setups).
    #[serde(rename = "none")]
    Disabled,
}
