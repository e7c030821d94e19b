//! In-process [`KvStore`] backed by a `HashMap`.

use std::collections::HashMap;
use std::sync::Mutex;

use sheetbind_shared::{Result, SheetbindError};

use crate::KvStore;

/// Volatile store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or_default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| SheetbindError::Storage("memory store lock poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl KvStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(name.to_string(), value.to_string());
        })?;
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_and_count() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set_all(&[("k", "v1"), ("t", "1")]).await.unwrap();
        store.set("k", "v2").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(store.write_count(), 3);
    }
}
