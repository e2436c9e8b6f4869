use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chunk_types::{Chunk, Hash};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// Storage format version reported by in-memory views.
pub const VERSION: &str = "7.18";

/// Ground truth for one namespace: the committed chunk table and root.
///
/// Shared by every [`MemoryStoreView`] vended through [`MemoryStorage::new_view`].
/// The only mutator is [`MemoryStorage::update`], a compare-and-swap on the
/// root that merges a batch of chunks in the same critical section. Readers
/// never observe a root without the chunks committed alongside it.
pub struct MemoryStorage {
    inner: RwLock<StorageState>,
}

#[derive(Default)]
struct StorageState {
    chunks: HashMap<Hash, Chunk>,
    root: Hash,
}

impl MemoryStorage {
    /// Create an empty store whose root is [`Hash::zero`].
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StorageState::default()),
        }
    }

    /// Vend a view over this store, initialised with the current root.
    pub fn new_view(self: &Arc<Self>) -> MemoryStoreView {
        self.new_view_with(StoreConfig::default())
    }

    /// Vend a view with explicit settings.
    pub fn new_view_with(self: &Arc<Self>, config: StoreConfig) -> MemoryStoreView {
        MemoryStoreView::new(Arc::clone(self), config)
    }

    /// Read a committed chunk, or [`Chunk::empty`] if absent.
    pub fn get(&self, hash: &Hash) -> Chunk {
        let state = self.inner.read().expect("lock poisoned");
        state.chunks.get(hash).cloned().unwrap_or_default()
    }

    /// Check whether a chunk has been committed.
    pub fn has(&self, hash: &Hash) -> bool {
        let state = self.inner.read().expect("lock poisoned");
        state.chunks.contains_key(hash)
    }

    /// Number of distinct committed chunks.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").chunks.len()
    }

    /// Returns `true` if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").chunks.is_empty()
    }

    /// The current committed root.
    pub fn root(&self) -> Hash {
        self.inner.read().expect("lock poisoned").root
    }

    /// Move the root from `last` to `current` and merge `novel`, atomically.
    ///
    /// Returns `false` and changes nothing when `last` is not the current
    /// root. A repeated hash overwrites the earlier chunk.
    pub fn update(&self, current: Hash, last: Hash, novel: &HashMap<Hash, Chunk>) -> bool {
        let mut state = self.inner.write().expect("lock poisoned");
        if state.root != last {
            debug!(
                expected = %last.short_hex(),
                actual = %state.root.short_hex(),
                "root conflict; update rejected"
            );
            return false;
        }
        state
            .chunks
            .extend(novel.iter().map(|(hash, chunk)| (*hash, chunk.clone())));
        state.root = current;
        debug!(
            root = %current.short_hex(),
            novel = novel.len(),
            total = state.chunks.len(),
            "root updated"
        );
        true
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("MemoryStorage")
            .field("chunk_count", &state.chunks.len())
            .field("root", &state.root)
            .finish()
    }
}

/// A transactional handle onto a [`MemoryStorage`].
///
/// `put`s land in a private pending buffer that only this view reads. The
/// root is a snapshot taken at creation, [`ChunkStore::rebase`], or
/// [`ChunkStore::commit`]; other views' commits are not reflected in it until
/// then. Views never contend with each other: they meet only inside
/// [`MemoryStorage::update`].
pub struct MemoryStoreView {
    storage: Arc<MemoryStorage>,
    config: StoreConfig,
    inner: RwLock<ViewState>,
}

struct ViewState {
    pending: HashMap<Hash, Chunk>,
    root: Hash,
}

impl MemoryStoreView {
    /// Create a view over `storage` with its root synced to the store's.
    pub fn new(storage: Arc<MemoryStorage>, config: StoreConfig) -> Self {
        let root = storage.root();
        Self {
            storage,
            config,
            inner: RwLock::new(ViewState {
                pending: HashMap::new(),
                root,
            }),
        }
    }

    /// Number of chunks buffered and not yet committed.
    pub fn pending_len(&self) -> usize {
        self.inner.read().expect("lock poisoned").pending.len()
    }

    /// The ground truth this view commits to.
    pub fn storage(&self) -> &Arc<MemoryStorage> {
        &self.storage
    }

    fn verify_pending(pending: &HashMap<Hash, Chunk>) -> StoreResult<()> {
        match pending.values().find(|chunk| !chunk.verify()) {
            Some(forged) => {
                warn!(chunk = %forged.hash().short_hex(), "pending chunk failed verification");
                Err(StoreError::HashMismatch {
                    declared: forged.hash(),
                })
            }
            None => Ok(()),
        }
    }
}

impl ChunkStore for MemoryStoreView {
    fn get(&self, hash: &Hash) -> StoreResult<Chunk> {
        let state = self.inner.read().expect("lock poisoned");
        if let Some(chunk) = state.pending.get(hash) {
            return Ok(chunk.clone());
        }
        Ok(self.storage.get(hash))
    }

    fn has(&self, hash: &Hash) -> StoreResult<bool> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.pending.contains_key(hash) || self.storage.has(hash))
    }

    fn put(&self, chunk: Chunk) -> StoreResult<()> {
        if chunk.is_sentinel() {
            return Ok(());
        }
        let mut state = self.inner.write().expect("lock poisoned");
        state.pending.insert(chunk.hash(), chunk);
        Ok(())
    }

    /// Pending plus committed. A pending chunk that is already committed is
    /// counted twice.
    fn len(&self) -> usize {
        let state = self.inner.read().expect("lock poisoned");
        state.pending.len() + self.storage.len()
    }

    fn root(&self) -> Hash {
        self.inner.read().expect("lock poisoned").root
    }

    fn rebase(&self) -> StoreResult<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        state.root = self.storage.root();
        Ok(())
    }

    fn commit(&self, current: Hash, last: Hash) -> StoreResult<bool> {
        let mut state = self.inner.write().expect("lock poisoned");
        // Known stale: reject without touching the ground truth.
        if last != state.root {
            debug!(
                expected = %last.short_hex(),
                snapshot = %state.root.short_hex(),
                "commit rejected against local root"
            );
            return Ok(false);
        }
        if self.config.verify_on_commit {
            Self::verify_pending(&state.pending)?;
        }

        let success = self.storage.update(current, last, &state.pending);
        if success {
            state.pending.clear();
        }
        state.root = self.storage.root();
        Ok(success)
    }

    fn version(&self) -> &str {
        VERSION
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStoreView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("MemoryStoreView")
            .field("pending_count", &state.pending.len())
            .field("root", &state.root)
            .field("storage", &self.storage)
            .finish()
    }
}
