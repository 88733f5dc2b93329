//! Maintains the schema-validity condition on [`SchemaDefinition`]s.
//!
//! The controller watches definitions, runs the validation engine over every
//! declared schema, and keeps the [`NON_STRUCTURAL_SCHEMA`] condition in
//! sync: materialized (with the violation list) while anything is wrong,
//! absent otherwise. Absence rather than `False` keeps "never checked"
//! distinguishable from "passed".
use super::{run_worker, wait_for_cache_sync, Reconciler};
use crate::client::{self, ObjectClient};
use crate::queue::WorkQueue;
use crate::reflector::{ObjectRef, Store};
use crate::watcher::Event;
use async_trait::async_trait;
use chrono::Utc;
use futures::{future, Stream, StreamExt};
use rudder_core::apis::SchemaDefinition;
use rudder_core::conditions::{self, Condition, ConditionStatus};
use rudder_core::schema::{validate_structural, ErrorList, SchemaSpec};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Condition type recording that a definition's declared schema is invalid.
pub const NON_STRUCTURAL_SCHEMA: &str = "NonStructuralSchema";

/// The engine could not process a schema at all.
///
/// Distinct from the schema having violations: this is reported on the
/// condition with reason `StructuralError` and status `Unknown`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationFailed(pub String);

/// Pluggable validation engine run over declared schemas.
pub trait SchemaValidator: Send + Sync {
    /// Collect violations for `schema`, anchored at `path`.
    fn validate(&self, schema: &SchemaSpec, path: &str) -> Result<ErrorList, ValidationFailed>;
}

/// The built-in structural checker.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, schema: &SchemaSpec, path: &str) -> Result<ErrorList, ValidationFailed> {
        Ok(validate_structural(schema, path))
    }
}

/// Maintains the [`NON_STRUCTURAL_SCHEMA`] condition on schema definitions.
pub struct ConditionController<C, V = StructuralValidator> {
    client: Arc<C>,
    validator: V,
    store: Store<SchemaDefinition>,
    queue: WorkQueue<ObjectRef>,
}

impl<C, V> ConditionController<C, V>
where
    C: ObjectClient<SchemaDefinition>,
    V: SchemaValidator,
{
    pub fn new(client: Arc<C>, store: Store<SchemaDefinition>, validator: V) -> Self {
        Self {
            client,
            validator,
            store,
            queue: WorkQueue::new(),
        }
    }

    /// Compute the desired condition for `def`, or `None` when every declared
    /// schema is clean.
    fn calculate_condition(&self, def: &SchemaDefinition) -> Option<Condition> {
        let mut all_errs = ErrorList::default();

        if let Some(schema) = &def.spec.schema {
            match self.validator.validate(schema, "spec.schema") {
                Ok(errs) => all_errs.extend(errs),
                Err(err) => {
                    return Some(
                        Condition::new(NON_STRUCTURAL_SCHEMA, ConditionStatus::Unknown)
                            .with_reason("StructuralError")
                            .with_message(format!("failed to check the global schema: {err}")),
                    );
                }
            }
        }
        for version in &def.spec.versions {
            let Some(schema) = &version.schema else {
                continue;
            };
            let path = format!("spec.versions[{}].schema", version.name);
            match self.validator.validate(schema, &path) {
                Ok(errs) => all_errs.extend(errs),
                Err(err) => {
                    return Some(
                        Condition::new(NON_STRUCTURAL_SCHEMA, ConditionStatus::Unknown)
                            .with_reason("StructuralError")
                            .with_message(format!(
                                "failed to check the schema for version {}: {err}",
                                version.name
                            )),
                    );
                }
            }
        }

        if all_errs.is_empty() {
            return None;
        }
        Some(
            Condition::new(NON_STRUCTURAL_SCHEMA, ConditionStatus::True)
                .with_reason("Violations")
                .with_message(all_errs.to_string()),
        )
    }

    /// Reconcile one key: recompute the condition from the cached spec and
    /// write the status back only if it changed.
    pub async fn sync(&self, key: &ObjectRef) -> Result<(), client::Error> {
        // a cache miss means the object is gone; nothing to clean up
        let Some(cached) = self.store.get(key) else {
            return Ok(());
        };
        // never mutate the shared cache copy
        let mut def = (*cached).clone();

        let desired = self.calculate_condition(&def);
        let existing = conditions::find(&def.status.conditions, NON_STRUCTURAL_SCHEMA);
        match desired {
            None => {
                if existing.is_none() {
                    return Ok(());
                }
                conditions::remove(&mut def.status.conditions, NON_STRUCTURAL_SCHEMA);
            }
            Some(cond) => {
                if let Some(old) = existing {
                    if old.same_as(&cond) {
                        // identical state: writing would only churn the
                        // transition timestamp
                        return Ok(());
                    }
                }
                let cond = Condition {
                    last_transition_time: Some(Utc::now()),
                    ..cond
                };
                conditions::set(&mut def.status.conditions, cond);
            }
        }

        match self.client.update_status(&def).await {
            Ok(_) => Ok(()),
            // deleted or changed in the meantime, the next event re-triggers us
            Err(err) if err.is_not_found() || err.is_conflict() => {
                tracing::debug!(%key, "status write raced a concurrent change, skipping");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn enqueue(&self, def: &SchemaDefinition) {
        let key = ObjectRef::from_obj(def);
        tracing::trace!(%key, "enqueueing");
        self.queue.add(key);
    }

    fn handle_event(&self, event: Event<SchemaDefinition>) {
        match event {
            Event::Applied(def) => self.enqueue(&def),
            // deletions need no condition bookkeeping; a cache miss in sync
            // covers the race
            Event::Deleted(_) => {}
            Event::Restarted(defs) => {
                for def in &defs {
                    self.enqueue(def);
                }
            }
        }
    }

    /// Drive the controller until `stop` fires or the event feed ends.
    ///
    /// `events` must be the post-reflector stream feeding the [`Store`]
    /// passed to [`new`](Self::new); keys derived from it are only processed
    /// once the store has completed its initial sync. Exactly one worker
    /// runs: the condition bookkeeping is not safe for concurrent mutation
    /// of overlapping state, and the queue is sized for a slow-moving API.
    pub async fn run<S>(self, events: S, stop: CancellationToken)
    where
        S: Stream<Item = Event<SchemaDefinition>>,
    {
        tracing::info!("starting schema condition controller");

        let queue = self.queue.clone();
        let pump = async {
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                self.handle_event(event);
            }
            tracing::debug!("event feed closed");
        };
        // close intake once the stop signal fires or the feed dies; queued
        // and in-flight work still completes
        let intake = async {
            tokio::select! {
                () = stop.cancelled() => {}
                () = pump => {}
            }
            queue.shut_down();
        };
        let worker = async {
            if wait_for_cache_sync(&self.store, &stop).await {
                run_worker(&self.queue, &self).await;
            }
        };
        future::join(intake, worker).await;
        tracing::info!("shutting down schema condition controller");
    }
}

#[async_trait]
impl<C, V> Reconciler for ConditionController<C, V>
where
    C: ObjectClient<SchemaDefinition>,
    V: SchemaValidator,
{
    type Error = client::Error;

    async fn sync(&self, key: &ObjectRef) -> Result<(), client::Error> {
        ConditionController::sync(self, key).await
    }
}
