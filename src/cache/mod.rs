//! Cache generation storage.
//!
//! A cache generation is a versioned, named store of request-key →
//! response-snapshot entries, replaceable only wholesale. This module
//! provides the storage trait plus two backends:
//! - `SqliteStore` - persistent, used by the CLI
//! - `MemoryStore` - in-memory, tests only

#[cfg(test)]
mod memory;
mod sqlite;
mod store;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::CacheStore;
