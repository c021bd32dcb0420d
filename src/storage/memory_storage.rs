use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::ClientStorage;

/// Process-local storage backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // The map is always left consistent, so a poisoned lock is still usable.
        match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("refresh_token").unwrap(), None);

        storage.set("refresh_token", "R1").unwrap();
        storage.set("refresh_token", "R2").unwrap();
        assert_eq!(storage.get("refresh_token").unwrap(), Some("R2".to_string()));

        storage.remove("refresh_token").unwrap();
        assert_eq!(storage.get("refresh_token").unwrap(), None);
        // Removing a missing key is not an error.
        assert!(storage.remove("refresh_token").is_ok());
    }
}
