use std::sync::Arc;

use tracing::info;

use super::{file_storage::FileStorage, memory_storage::MemoryStorage, no_storage::NoStorage};
use crate::config::StorageConfig;

/// Key under which the refresh token is persisted.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable key/value storage on the client side (the equivalent of a browser's
/// local storage). Operations are synchronous and local.
pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;
    fn is_enabled(&self) -> bool {
        // False for backends that drop writes.
        true
    }
}

/// Creates a concrete storage backend based on the StorageConfig.
pub fn create_storage(config: &StorageConfig) -> Arc<dyn ClientStorage> {
    match config {
        StorageConfig::Memory => {
            info!("Using in-memory client storage; sessions will not survive a restart.");
            Arc::new(MemoryStorage::new())
        }
        StorageConfig::File { path } => {
            info!("Using file client storage at {}", path.display());
            Arc::new(FileStorage::new(path.clone()))
        }
        StorageConfig::Disabled => {
            info!("Client storage is disabled. Using NoStorage.");
            Arc::new(NoStorage::new())
        }
    }
}
