//! In-memory test doubles for the rudder client traits.
//!
//! [`FakeApi`] stands in for the backing store: it enforces the same
//! resource-version compare-and-swap discipline on writes, counts status
//! updates so tests can assert on write amplification, and records pod
//! deletions in call order. Controllers are generic over the client traits,
//! so production and test code share the same boundary.
use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use rudder_core::apis::Pod;
use rudder_core::{ErrorResponse, Resource};
use rudder_runtime::client::{Error, ObjectClient, PodClient, Result};
use rudder_runtime::reflector::ObjectRef;

/// An in-memory stand-in for the backing store.
pub struct FakeApi<K> {
    state: Mutex<FakeState<K>>,
}

struct FakeState<K> {
    objects: AHashMap<ObjectRef, K>,
    next_version: u64,
    update_calls: usize,
    deleted: Vec<String>,
    fail_next: Option<Error>,
}

impl<K> Default for FakeApi<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState {
                objects: AHashMap::new(),
                next_version: 0,
                update_calls: 0,
                deleted: Vec::new(),
                fail_next: None,
            }),
        }
    }
}

impl<K: Resource + Clone> FakeApi<K> {
    /// Seed (or overwrite) an object, assigning it a fresh resource version.
    ///
    /// Returns the stored copy, with the version populated; feed that copy
    /// into caches so that subsequent CAS writes line up.
    pub fn insert(&self, mut obj: K) -> K {
        let mut state = self.state.lock();
        state.next_version += 1;
        obj.meta_mut().resource_version = Some(state.next_version.to_string());
        state.objects.insert(ObjectRef::from_obj(&obj), obj.clone());
        obj
    }

    /// Drop an object, simulating an out-of-band deletion.
    pub fn remove(&self, key: &ObjectRef) {
        self.state.lock().objects.remove(key);
    }

    /// The currently stored copy, if any.
    pub fn find(&self, key: &ObjectRef) -> Option<K> {
        self.state.lock().objects.get(key).cloned()
    }

    /// Number of `update_status` calls observed, including rejected ones.
    pub fn update_calls(&self) -> usize {
        self.state.lock().update_calls
    }

    /// Names of pods deleted through [`PodClient`], in call order.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    /// Fail the next store operation with `err`.
    pub fn fail_next(&self, err: Error) {
        self.state.lock().fail_next = Some(err);
    }
}

#[async_trait]
impl<K: Resource + Clone + Send + Sync> ObjectClient<K> for FakeApi<K> {
    async fn get(&self, key: &ObjectRef) -> Result<K> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Api(ErrorResponse::not_found(K::kind(), &key.name)))
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let mut state = self.state.lock();
        state.update_calls += 1;
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let key = ObjectRef::from_obj(obj);
        let Some(stored) = state.objects.get(&key) else {
            return Err(Error::Api(ErrorResponse::not_found(K::kind(), &key.name)));
        };
        if stored.resource_version() != obj.resource_version() {
            return Err(Error::Api(ErrorResponse::conflict(K::kind(), &key.name)));
        }
        state.next_version += 1;
        let mut updated = obj.clone();
        updated.meta_mut().resource_version = Some(state.next_version.to_string());
        state.objects.insert(key, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl PodClient for FakeApi<Pod> {
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let key = ObjectRef::new(name).within(namespace);
        if state.objects.remove(&key).is_none() {
            return Err(Error::Api(ErrorResponse::not_found("Pod", name)));
        }
        state.deleted.push(name.to_string());
        Ok(())
    }
}
