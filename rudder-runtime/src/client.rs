//! Narrow client traits over the backing store.
//!
//! Production and test code share these boundaries: controllers are generic
//! over them, production wires in the real store client, tests inject
//! in-memory fakes. The store's own protocol (transport, serialization,
//! optimistic-concurrency enforcement) lives behind the trait.
use crate::reflector::ObjectRef;
use async_trait::async_trait;
use rudder_core::ErrorResponse;
use thiserror::Error;

/// Errors from backing-store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The store rejected the request; the payload carries the kind.
    #[error("api error: {0}")]
    Api(#[source] ErrorResponse),
    /// Transport-level failure talking to the store.
    #[error("service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Whether this is a benign "object is gone" response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api(resp) if resp.is_not_found())
    }

    /// Whether this is an optimistic-concurrency version mismatch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Api(resp) if resp.is_conflict())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Read/write access to objects of kind `K` in the backing store.
#[async_trait]
pub trait ObjectClient<K>: Send + Sync {
    /// Fetch the current version of the object.
    async fn get(&self, key: &ObjectRef) -> Result<K>;

    /// Replace the status of the object.
    ///
    /// The write is rejected with a conflict if the object's resource version
    /// no longer matches the store's; callers carry the version through from
    /// the copy they read.
    async fn update_status(&self, obj: &K) -> Result<K>;
}

/// Deletion access to pods, used by the rolling-update controller.
#[async_trait]
pub trait PodClient: Send + Sync {
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;
}
