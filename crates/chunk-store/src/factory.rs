use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::memory::{MemoryStorage, MemoryStoreView};
use crate::traits::{ChunkStore, ChunkStoreFactory};

/// Registry of in-memory ground-truth stores keyed by namespace.
///
/// Each namespace gets one [`MemoryStorage`] for the factory's lifetime,
/// created on first use. Every `create_store` call vends a fresh
/// [`MemoryStoreView`] over it. After [`MemoryStoreFactory::shutter`] the
/// registry is gone and any further `create_store` panics: using a factory
/// after shutdown is a lifecycle bug, not a runtime condition.
pub struct MemoryStoreFactory {
    config: StoreConfig,
    stores: Mutex<Option<HashMap<String, Arc<MemoryStorage>>>>,
}

impl MemoryStoreFactory {
    /// Create a factory with default view settings.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create a factory whose views all use `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            stores: Mutex::new(Some(HashMap::new())),
        }
    }

    /// Vend a view over the store for `namespace`, creating it if needed.
    ///
    /// # Panics
    ///
    /// Panics if called after [`MemoryStoreFactory::shutter`].
    pub fn view(&self, namespace: &str) -> MemoryStoreView {
        let storage = {
            let mut guard = self.stores.lock().expect("lock poisoned");
            guard.as_mut().map(|stores| {
                let storage = stores.entry(namespace.to_string()).or_insert_with(|| {
                    debug!(namespace, "created in-memory store");
                    Arc::new(MemoryStorage::new())
                });
                Arc::clone(storage)
            })
        };
        // Guard released first so the panic does not poison the registry.
        let Some(storage) = storage else {
            panic!("cannot use MemoryStoreFactory after shutter()");
        };
        storage.new_view_with(self.config.clone())
    }

    /// Namespaces created so far, sorted. Empty after shutdown.
    pub fn namespaces(&self) -> Vec<String> {
        let guard = self.stores.lock().expect("lock poisoned");
        let mut names: Vec<String> = guard
            .as_ref()
            .map(|stores| stores.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Returns `true` once [`MemoryStoreFactory::shutter`] has run.
    pub fn is_shuttered(&self) -> bool {
        self.stores.lock().expect("lock poisoned").is_none()
    }

    /// Drop the registry. Views already vended keep working on their store.
    pub fn shutter(&self) {
        let released = self.stores.lock().expect("lock poisoned").take();
        if let Some(stores) = released {
            info!(namespaces = stores.len(), "memory store factory shut down");
        }
    }
}

impl Default for MemoryStoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStoreFactory for MemoryStoreFactory {
    fn create_store(&self, namespace: &str) -> Box<dyn ChunkStore> {
        Box::new(self.view(namespace))
    }

    // No separate cache tier: a cache hit and a cold create are the same path.
    fn create_store_from_cache(&self, namespace: &str) -> Box<dyn ChunkStore> {
        self.create_store(namespace)
    }

    fn shutter(&self) {
        MemoryStoreFactory::shutter(self);
    }
}

impl std::fmt::Debug for MemoryStoreFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStoreFactory")
            .field("config", &self.config)
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_types::{Chunk, Hash};
    use std::thread;

    #[test]
    fn end_to_end_commit_is_seen_by_second_view() {
        let factory = MemoryStoreFactory::new();
        let s = factory.create_store("a");
        let x = Chunk::new(b"chunk X".to_vec());
        let x_state = Hash::of(b"X-state");

        s.put(x.clone()).unwrap();
        assert!(s.commit(x_state, Hash::zero()).unwrap());
        assert!(s.has(&x.hash()).unwrap());
        assert_eq!(s.root(), x_state);

        let t = factory.create_store("a");
        assert!(t.has(&x.hash()).unwrap());
        assert_eq!(t.root(), x_state);
    }

    #[test]
    fn namespaces_are_isolated() {
        let factory = MemoryStoreFactory::new();
        let a = factory.create_store("a");
        let x = Chunk::new(b"only in a".to_vec());
        a.put(x.clone()).unwrap();
        assert!(a.commit(Hash::of(b"a1"), Hash::zero()).unwrap());

        let b = factory.create_store("b");
        assert!(!b.has(&x.hash()).unwrap());
        assert!(b.root().is_zero());
        assert!(b.is_empty());
    }

    #[test]
    fn create_store_from_cache_shares_backing_store() {
        let factory = MemoryStoreFactory::new();
        let fresh = factory.create_store("ns");
        fresh.put(Chunk::new(b"c".to_vec())).unwrap();
        assert!(fresh.commit(Hash::of(b"r"), Hash::zero()).unwrap());

        let cached = factory.create_store_from_cache("ns");
        assert_eq!(cached.root(), Hash::of(b"r"));
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn views_share_one_storage_per_namespace() {
        let factory = MemoryStoreFactory::new();
        let v1 = factory.view("ns");
        let v2 = factory.view("ns");
        let other = factory.view("other");
        assert!(Arc::ptr_eq(v1.storage(), v2.storage()));
        assert!(!Arc::ptr_eq(v1.storage(), other.storage()));
        assert_eq!(factory.namespaces(), vec!["ns".to_string(), "other".to_string()]);
    }

    #[test]
    fn config_is_applied_to_views() {
        let factory = MemoryStoreFactory::with_config(StoreConfig {
            verify_on_commit: true,
        });
        let view = factory.create_store("ns");
        view.put(Chunk::with_hash(Hash::of(b"lie"), b"truth".to_vec()))
            .unwrap();
        assert!(view.commit(Hash::of(b"r"), Hash::zero()).is_err());
    }

    #[test]
    fn shutter_clears_registry() {
        let factory = MemoryStoreFactory::new();
        let _ = factory.create_store("a");
        assert!(!factory.is_shuttered());
        ChunkStoreFactory::shutter(&factory);
        assert!(factory.is_shuttered());
        assert!(factory.namespaces().is_empty());
    }

    #[test]
    fn vended_views_survive_shutter() {
        let factory = MemoryStoreFactory::new();
        let view = factory.create_store("a");
        factory.shutter();
        view.put(Chunk::new(b"late".to_vec())).unwrap();
        assert!(view.commit(Hash::of(b"r"), Hash::zero()).unwrap());
    }

    #[test]
    #[should_panic(expected = "after shutter")]
    fn create_after_shutter_panics() {
        let factory = MemoryStoreFactory::new();
        factory.shutter();
        let _ = factory.create_store("a");
    }

    #[test]
    #[should_panic(expected = "after shutter")]
    fn create_from_cache_after_shutter_panics() {
        let factory = MemoryStoreFactory::new();
        factory.shutter();
        let _ = factory.create_store_from_cache("a");
    }

    #[test]
    fn failed_create_leaves_factory_readable() {
        let factory = MemoryStoreFactory::new();
        let _ = factory.create_store("a");
        factory.shutter();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = factory.create_store("a");
        }));
        assert!(caught.is_err());
        assert!(factory.is_shuttered());
        assert!(factory.namespaces().is_empty());
        assert!(format!("{factory:?}").contains("MemoryStoreFactory"));
    }

    #[test]
    fn concurrent_lookups_create_one_store() {
        let factory = Arc::new(MemoryStoreFactory::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = Arc::clone(&factory);
                thread::spawn(move || Arc::clone(factory.view("shared").storage()))
            })
            .collect();
        let storages: Vec<Arc<MemoryStorage>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        for s in &storages[1..] {
            assert!(Arc::ptr_eq(&storages[0], s));
        }
        assert_eq!(factory.namespaces().len(), 1);
    }
}
