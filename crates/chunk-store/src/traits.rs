use std::collections::HashSet;

use chunk_types::{Chunk, Hash};

use crate::error::StoreResult;

/// Chunks found by [`ChunkStore::get_many`], in no particular order.
///
/// A one-shot iterator: it is produced only after the whole batch was read
/// without error, so a failed batch delivers nothing.
pub type FoundChunks = std::vec::IntoIter<Chunk>;

/// Transactional, content-addressed chunk store.
///
/// Every backend (in-memory, disk, network) must satisfy the same contract:
/// - `put` buffers a chunk so that this handle can read it back immediately,
///   but no other handle sees it until a successful `commit`.
/// - `commit(current, last)` publishes the buffered chunks and moves the root
///   from `last` to `current` atomically, or does nothing and returns
///   `Ok(false)` when `last` is not the current root.
/// - `root` is the root this handle last synced, not necessarily the latest.
/// - `Err` is reserved for real failures (I/O, integrity). A lost commit race
///   is never an error.
pub trait ChunkStore: Send + Sync {
    /// Read a chunk. Returns [`Chunk::empty`] when it does not exist.
    fn get(&self, hash: &Hash) -> StoreResult<Chunk>;

    /// Read a batch of chunks. Missing hashes are skipped.
    ///
    /// The first read error aborts the batch and nothing is returned.
    fn get_many(&self, hashes: &HashSet<Hash>) -> StoreResult<FoundChunks> {
        let mut found = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let chunk = self.get(hash)?;
            if !chunk.is_sentinel() {
                found.push(chunk);
            }
        }
        Ok(found.into_iter())
    }

    /// Check whether a chunk exists.
    fn has(&self, hash: &Hash) -> StoreResult<bool>;

    /// Return the subset of `hashes` that does not exist.
    fn has_many(&self, hashes: &HashSet<Hash>) -> StoreResult<HashSet<Hash>> {
        let mut absent = HashSet::new();
        for hash in hashes {
            if !self.has(hash)? {
                absent.insert(*hash);
            }
        }
        Ok(absent)
    }

    /// Buffer a chunk for the next commit. Idempotent per hash.
    fn put(&self, chunk: Chunk) -> StoreResult<()>;

    /// Approximate number of chunks reachable from this handle.
    fn len(&self) -> usize;

    /// Returns `true` if no chunks are reachable from this handle.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The root this handle last synced.
    fn root(&self) -> Hash;

    /// Refresh the root from the backing store. Buffered chunks are kept.
    fn rebase(&self) -> StoreResult<()>;

    /// Publish buffered chunks and move the root from `last` to `current`.
    ///
    /// Returns `Ok(false)` on a root conflict; the handle is rebased either
    /// way and keeps its buffered chunks for a retry.
    fn commit(&self, current: Hash, last: Hash) -> StoreResult<bool>;

    /// Storage format version reported by this backend.
    fn version(&self) -> &str;

    /// Release backend resources.
    fn close(&self) -> StoreResult<()>;

    /// Telemetry, for backends that collect it.
    fn stats(&self) -> Option<&dyn StoreStats> {
        None
    }

    /// Human-readable telemetry summary.
    fn stats_summary(&self) -> String {
        match self.stats() {
            Some(stats) => stats.summary(),
            None => "Unsupported".to_string(),
        }
    }
}

/// Optional telemetry capability of a [`ChunkStore`] backend.
pub trait StoreStats: Send + Sync {
    /// One-line summary suitable for logs.
    fn summary(&self) -> String;
}

/// Vends [`ChunkStore`] handles keyed by namespace.
pub trait ChunkStoreFactory: Send + Sync {
    /// Open a store for `namespace`, creating it on first use.
    fn create_store(&self, namespace: &str) -> Box<dyn ChunkStore>;

    /// Open a store for `namespace` through the backend's cache, if any.
    fn create_store_from_cache(&self, namespace: &str) -> Box<dyn ChunkStore> {
        self.create_store(namespace)
    }

    /// Release every store. The factory must not be used afterwards.
    fn shutter(&self);
}
