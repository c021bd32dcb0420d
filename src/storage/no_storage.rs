use super::ClientStorage;

/// A storage that keeps nothing: writes are dropped and reads come back empty.
///
/// Used when there is no durable store available (server-side rendering) or when
/// the server manages the refresh token through a cookie.
pub struct NoStorage;

impl NoStorage {
    pub fn new() -> Self {
        NoStorage
    }
}

impl Default for NoStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStorage for NoStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, String> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), String> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), String> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that values written to NoStorage are never read back.
    #[test]
    fn test_no_storage_forgets_everything() {
        let storage = NoStorage::new();
        storage.set("refresh_token", "R1").unwrap();
        assert_eq!(storage.get("refresh_token").unwrap(), None);
        assert!(storage.remove("refresh_token").is_ok());
        assert!(!storage.is_enabled());
    }
}
