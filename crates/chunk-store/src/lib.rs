//! Transactional, content-addressed chunk storage.
//!
//! A [`MemoryStorage`] is the ground truth for one namespace: a table of
//! immutable chunks keyed by hash, plus a single root hash. Consumers never
//! touch it directly. They work through a [`MemoryStoreView`], which buffers
//! `put`s locally and publishes them with [`ChunkStore::commit`], a
//! compare-and-swap on the root.
//!
//! # Commit Protocol
//!
//! 1. `put` chunks into a view. They are visible to that view only.
//! 2. `commit(current, last)`: if `last` is the root the view last saw, the
//!    view hands its pending chunks to [`MemoryStorage::update`].
//! 3. `update` succeeds iff `last` is still the authoritative root. On success
//!    the chunks are merged and the root becomes `current`, atomically.
//! 4. Win or lose, the view resyncs its root. A loser keeps its pending
//!    chunks and may retry against the new root.
//!
//! # Namespaces
//!
//! [`MemoryStoreFactory`] maps namespace strings to ground-truth stores and
//! vends a fresh view per call. Views of the same namespace see each other's
//! commits; different namespaces share nothing.

pub mod config;
pub mod error;
pub mod factory;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use factory::MemoryStoreFactory;
pub use memory::{MemoryStorage, MemoryStoreView, VERSION};
pub use traits::{ChunkStore, ChunkStoreFactory, FoundChunks, StoreStats};
