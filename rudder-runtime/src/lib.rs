//! Runtime building blocks for rudder controllers.
//!
//! This crate contains the pieces needed to write level-triggered controllers
//! against an eventually-consistent object cache:
//!
//! - a deduplicating, rate-limited work [`queue`] of reconciliation keys,
//!   which doubles as the per-key mutual-exclusion mechanism;
//! - a [`reflector`] that maintains a local [`Store`] from a stream of
//!   [`watcher`] events and gates workers on the initial sync;
//! - narrow [`client`] traits over the backing store, with benign error
//!   kinds (not-found, conflict) distinguishable from transient ones;
//! - the [`controller`]s built on top: the schema condition controller and
//!   the daemon-set rolling-update controller.
//!
//! Controllers are plain futures driven by the caller; a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is the only
//! stop mechanism, and in-flight reconciliations always run to completion.

pub mod client;
pub mod controller;
pub mod queue;
pub mod reflector;
pub mod utils;
pub mod watcher;

pub use controller::{ConditionController, DaemonSetUpdateController};
pub use queue::WorkQueue;
pub use reflector::{reflector, ObjectRef, Store};
