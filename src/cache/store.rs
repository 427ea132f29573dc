//! Cache store trait shared by the SQLite and in-memory backends.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::http::Response;

/// A single cached entry with its write timestamp.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// The stored response snapshot
  pub response: Response,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache generation storage backends.
///
/// A generation is a named map from request key to response snapshot.
/// Each operation is atomic at the entry level; there is no cross-entry
/// transactionality and none is needed (last writer wins per key).
pub trait CacheStore: Send + Sync {
  /// Open a generation, creating it if absent.
  fn open_generation(&self, name: &str) -> Result<()>;

  /// Look up an entry in a generation by request key.
  fn get(&self, generation: &str, key: &str) -> Result<Option<CachedEntry>>;

  /// Write an entry, replacing any previous entry for the same key.
  ///
  /// `url` is stored alongside the snapshot for inspection; the key alone
  /// identifies the entry.
  fn put(&self, generation: &str, key: &str, url: &str, response: &Response) -> Result<()>;

  /// List all generation names present in the store.
  fn generation_names(&self) -> Result<Vec<String>>;

  /// Delete a whole generation and all of its entries.
  ///
  /// Returns true if the generation existed.
  fn delete_generation(&self, name: &str) -> Result<bool>;
}
