//! SessionStorage trait and the in-memory store

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::SessionError;

/// Key/value storage scoped to one application session.
///
/// Values survive for as long as the storage itself does; a new storage is a
/// new, logged-out session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Returns the stored value for `key`, if any.
    async fn get_item(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), SessionError>;
}

/// Session storage held in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: DashMap<String, String>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.items.get(key).map(|value| value.clone()))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), SessionError> {
        self.items.remove(key);
        Ok(())
    }
}
