use super::ObjectRef;
use crate::utils::delayed_init::{DelayedInit, InitDropped, Initializer};
use crate::watcher;
use ahash::AHashMap;
use parking_lot::RwLock;
use rudder_core::Resource;
use std::sync::Arc;

type Cache<K> = Arc<RwLock<AHashMap<ObjectRef, Arc<K>>>>;

/// A writable handle to a [`Store`].
///
/// Exclusive: exactly one writer exists per store, and it must be moved into
/// the reflector that feeds it. Sharing a writer between feeds would let one
/// feed's `Restarted` clobber the other's state.
#[derive(Debug)]
pub struct Writer<K> {
    cache: Cache<K>,
    ready_tx: Option<Initializer<()>>,
    ready_rx: Arc<DelayedInit<()>>,
}

impl<K: Resource + Clone> Writer<K> {
    /// Return a fresh read handle to the store.
    ///
    /// Any number of read handles may be taken.
    #[must_use]
    pub fn as_reader(&self) -> Store<K> {
        Store {
            cache: Arc::clone(&self.cache),
            ready_rx: Arc::clone(&self.ready_rx),
        }
    }

    /// Applies a single watcher event to the store.
    pub fn apply_watcher_event(&mut self, event: &watcher::Event<K>) {
        match event {
            watcher::Event::Applied(obj) => {
                self.cache
                    .write()
                    .insert(ObjectRef::from_obj(obj), Arc::new(obj.clone()));
            }
            watcher::Event::Deleted(obj) => {
                self.cache.write().remove(&ObjectRef::from_obj(obj));
            }
            watcher::Event::Restarted(objs) => {
                let objs = objs
                    .iter()
                    .map(|obj| (ObjectRef::from_obj(obj), Arc::new(obj.clone())))
                    .collect();
                *self.cache.write() = objs;
                // the first full list completes the initial sync
                if let Some(ready) = self.ready_tx.take() {
                    ready.init(());
                }
            }
        }
    }
}

/// A readable, eventually-consistent cache of objects of kind `K`.
///
/// Cloning produces another handle to the same backing cache. The cache may
/// lag the backing store: deleted objects can linger and new objects can be
/// missing. Reconcilers tolerate both by re-deriving everything from the
/// object they find (or treating a miss as deletion).
#[derive(Debug)]
pub struct Store<K> {
    cache: Cache<K>,
    ready_rx: Arc<DelayedInit<()>>,
}

impl<K> Clone for Store<K> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            ready_rx: Arc::clone(&self.ready_rx),
        }
    }
}

impl<K: Resource + Clone> Store<K> {
    /// Wait for the feed's initial full list to have been applied.
    ///
    /// Workers gate on this before processing their first key, so that an
    /// incomplete cache cannot masquerade as a wave of deletions.
    ///
    /// # Errors
    ///
    /// Fails if the writer was dropped before completing the initial sync.
    pub async fn wait_until_ready(&self) -> Result<(), InitDropped> {
        self.ready_rx.get().await
    }

    /// Retrieve the entry for `key`, if cached.
    ///
    /// The returned `Arc` points into the cache; clone the inner value before
    /// mutating anything destined for a write-back.
    #[must_use]
    pub fn get(&self, key: &ObjectRef) -> Option<Arc<K>> {
        self.cache.read().get(key).cloned()
    }

    /// Snapshot of all currently cached values, in unspecified order.
    #[must_use]
    pub fn state(&self) -> Vec<Arc<K>> {
        self.cache.read().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

/// Create a fresh `(reader, writer)` store pair.
#[must_use]
pub fn store<K: Resource + Clone>() -> (Store<K>, Writer<K>) {
    let (ready_tx, ready_rx) = DelayedInit::new();
    let writer = Writer {
        cache: Arc::default(),
        ready_tx: Some(ready_tx),
        ready_rx: Arc::new(ready_rx),
    };
    let reader = writer.as_reader();
    (reader, writer)
}
