//! Host consent storage abstraction.
//!
//! The host app persists the user's consent decision under a single key
//! (see [`crate::settings::ConsentSettings::storage_key`]). Adapters only read
//! it; `"1"` means granted, anything else means denied.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use error_stack::Report;

use crate::error::MediationError;

/// Read access to the host's key-value consent storage.
pub trait ConsentStore: Send + Sync {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(Some(value))` if the key exists,
    /// `Ok(None)` if the key doesn't exist,
    /// or `Err` if there was an error accessing the store.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Configuration`] when the storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Report<MediationError>>;
}

/// In-memory store used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryConsentStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConsentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.set(key, value);
        store
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl ConsentStore for MemoryConsentStore {
    fn get(&self, key: &str) -> Result<Option<String>, Report<MediationError>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_none() {
        let store = MemoryConsentStore::new();
        assert_eq!(store.get("consent").expect("readable"), None);
    }

    #[test]
    fn test_set_and_remove() {
        let store = MemoryConsentStore::with_value("consent", "1");
        assert_eq!(store.get("consent").expect("readable").as_deref(), Some("1"));

        store.remove("consent");
        assert_eq!(store.get("consent").expect("readable"), None);
    }
}
