use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use quillsign_core::{ClientStore, PortalResult};

/// In-memory client store for session tests that don't need a database.
#[derive(Default)]
pub struct MemoryClientStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn get(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .expect("client store lock poisoned")
            .get(key)
            .cloned())
    }

    async fn put(&self, key: &str, value: &str) -> PortalResult<()> {
        self.entries
            .lock()
            .expect("client store lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortalResult<()> {
        self.entries
            .lock()
            .expect("client store lock poisoned")
            .remove(key);
        Ok(())
    }
}
