//! Local key-value persistence.
//!
//! This module provides the `KeyValueStore` trait used for the session token,
//! the per-surface practice records and the daily goal, along with two
//! implementations:
//! - `MemoryStore`: process-local, used for tests and ephemeral sessions
//! - `FileStore`: a single JSON map on disk, written through on every change

pub mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};
