//! Shared controller machinery: the reconciler trait and the worker loop.
pub mod daemon;
pub mod schema;

pub use daemon::{
    is_pod_updated, template_hash, DaemonSetUpdateController, DefaultPlacement, NodePlacement,
    PlacementError, TEMPLATE_HASH_LABEL,
};
pub use schema::{
    ConditionController, SchemaValidator, StructuralValidator, ValidationFailed,
    NON_STRUCTURAL_SCHEMA,
};

use crate::queue::WorkQueue;
use crate::reflector::{ObjectRef, Store};
use async_trait::async_trait;
use rudder_core::Resource;
use tokio_util::sync::CancellationToken;

/// Tuning for a controller's worker pool.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of concurrent workers pulling from the queue.
    ///
    /// Per-key exclusivity is guaranteed by the queue regardless of this
    /// value; raising it only parallelizes across distinct keys.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// A keyed reconciliation function.
///
/// `sync` must be idempotent, must re-derive everything from current state
/// rather than remembered events, and must treat a missing object as
/// success: deletion races under an eventually-consistent cache are expected
/// and benign.
#[async_trait]
pub trait Reconciler: Send + Sync {
    type Error: std::error::Error + Send;

    async fn sync(&self, key: &ObjectRef) -> Result<(), Self::Error>;
}

/// Pull keys off the queue until shutdown, retrying failures with backoff.
///
/// Success resets the key's backoff; failure is logged and re-queued
/// rate-limited. Either way the key is released, so a duplicate add that
/// arrived mid-flight gets its deferred delivery. One key's failure never
/// blocks other keys.
pub async fn run_worker<R: Reconciler>(queue: &WorkQueue<ObjectRef>, reconciler: &R) {
    while let Some(key) = queue.get().await {
        match reconciler.sync(&key).await {
            Ok(()) => queue.forget(&key),
            Err(error) => {
                tracing::error!(%key, %error, "reconciliation failed, requeueing");
                queue.add_rate_limited(key.clone());
            }
        }
        queue.done(&key);
    }
}

/// Wait for the store's initial sync, aborting early on the stop signal.
///
/// Returns `false` when the controller should bail out instead of starting
/// its workers: the stop signal fired, or the cache feed died before ever
/// completing a full list.
pub(crate) async fn wait_for_cache_sync<K: Resource + Clone>(
    store: &Store<K>,
    stop: &CancellationToken,
) -> bool {
    tokio::select! {
        () = stop.cancelled() => false,
        ready = store.wait_until_ready() => match ready {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("cache feed closed before completing the initial sync");
                false
            }
        },
    }
}
