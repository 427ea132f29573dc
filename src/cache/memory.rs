//! In-memory cache store used by tests.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::store::{CacheStore, CachedEntry};
use crate::http::Response;

/// Cache store backed by a mutex-guarded map of generations.
///
/// The original URL passed to `put` is not retained; the key alone
/// identifies an entry.
#[derive(Default)]
pub struct MemoryStore {
  generations: Mutex<HashMap<String, HashMap<String, CachedEntry>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries in a generation, if it exists. Test helper.
  pub fn entry_count(&self, generation: &str) -> Option<usize> {
    let generations = self.generations.lock().ok()?;
    generations.get(generation).map(|g| g.len())
  }
}

impl CacheStore for MemoryStore {
  fn open_generation(&self, name: &str) -> Result<()> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    generations.entry(name.to_string()).or_default();
    Ok(())
  }

  fn get(&self, generation: &str, key: &str) -> Result<Option<CachedEntry>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(generations.get(generation).and_then(|g| g.get(key)).cloned())
  }

  fn put(&self, generation: &str, key: &str, _url: &str, response: &Response) -> Result<()> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    generations.entry(generation.to_string()).or_default().insert(
      key.to_string(),
      CachedEntry {
        response: response.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn generation_names(&self) -> Result<Vec<String>> {
    let generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut names: Vec<String> = generations.keys().cloned().collect();
    names.sort();
    Ok(names)
  }

  fn delete_generation(&self, name: &str) -> Result<bool> {
    let mut generations = self
      .generations
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(generations.remove(name).is_some())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::ResponseKind;

  fn response(body: &[u8]) -> Response {
    Response {
      status: 200,
      headers: vec![("content-type".to_string(), "text/plain".to_string())],
      body: body.to_vec(),
      kind: ResponseKind::Basic,
    }
  }

  #[test]
  fn test_put_get_roundtrip() {
    let store = MemoryStore::new();
    store.open_generation("v1").unwrap();
    store
      .put("v1", "key1", "http://localhost/a", &response(b"hello"))
      .unwrap();

    let entry = store.get("v1", "key1").unwrap().unwrap();
    assert_eq!(entry.response.body, b"hello");
    assert!(store.get("v1", "missing").unwrap().is_none());
    assert!(store.get("v2", "key1").unwrap().is_none());
  }

  #[test]
  fn test_put_replaces_existing_entry() {
    let store = MemoryStore::new();
    store
      .put("v1", "key1", "http://localhost/a", &response(b"old"))
      .unwrap();
    store
      .put("v1", "key1", "http://localhost/a", &response(b"new"))
      .unwrap();

    let entry = store.get("v1", "key1").unwrap().unwrap();
    assert_eq!(entry.response.body, b"new");
    assert_eq!(store.entry_count("v1"), Some(1));
  }

  #[test]
  fn test_generation_listing_and_deletion() {
    let store = MemoryStore::new();
    store.open_generation("v1").unwrap();
    store.open_generation("v2").unwrap();
    assert_eq!(store.generation_names().unwrap(), vec!["v1", "v2"]);

    assert!(store.delete_generation("v1").unwrap());
    assert!(!store.delete_generation("v1").unwrap());
    assert_eq!(store.generation_names().unwrap(), vec!["v2"]);
  }
}
