//! Key/value persistence. The browser build talks to `window.localStorage`;
//! tests and private-browsing sessions fall back to an in-memory map.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{GameError, Result, describe_js};

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// `window.localStorage` wrapper.
pub struct BrowserStorage {
    inner: web_sys::Storage,
}

impl BrowserStorage {
    /// None when the window has no storage (disabled cookies, sandboxed iframe).
    pub fn from_window() -> Option<Self> {
        let win = web_sys::window()?;
        let inner = win.local_storage().ok().flatten()?;
        Some(Self { inner })
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner
            .get_item(key)
            .map_err(|e| GameError::Storage(describe_js(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .set_item(key, value)
            .map_err(|e| GameError::Storage(describe_js(&e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner
            .remove_item(key)
            .map_err(|e| GameError::Storage(describe_js(&e)))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    map: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }
}

/// Pick localStorage when available, otherwise keep progress for this session only.
pub fn default_store() -> Box<dyn KeyValueStore> {
    match BrowserStorage::from_window() {
        Some(s) => Box::new(s),
        None => {
            log::warn!("localStorage unavailable; progress will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.set("k", "w").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("w"));
        assert_eq!(store.len(), 1);
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }
}
