//! Rolling updates for daemon sets under an unavailability budget.
//!
//! A pass partitions a set's pods into "new" (created from the current
//! template) and "old" (anything else) by comparing a template hash recorded
//! on each pod, then deletes old pods without ever letting the number of
//! unavailable pods exceed the configured budget. Replacement pods are
//! created by the generic scheduling path once the deletions land; this
//! controller only plans and issues deletions.
use super::{run_worker, wait_for_cache_sync, Config, Reconciler};
use crate::client::{self, PodClient};
use crate::queue::WorkQueue;
use crate::reflector::{ObjectRef, Store};
use crate::watcher::Event;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{future, Stream, StreamExt};
use rudder_core::apis::{is_pod_available, DaemonSet, Node, Pod, PodTemplateSpec};
use rudder_core::{intstr, IntOrString, Resource};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Label recording the hash of the template a pod was created from.
pub const TEMPLATE_HASH_LABEL: &str = "rudder.io/template-hash";

/// The placement predicate could not be evaluated for a node.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PlacementError(pub String);

/// Decides whether a daemon pod should run on a node.
///
/// Injected so that production can wire in the full scheduling predicate
/// while the planner stays testable with a literal implementation.
pub trait NodePlacement: Send + Sync {
    fn should_run(&self, node: &Node, ds: &DaemonSet) -> Result<bool, PlacementError>;
}

/// Placement on every schedulable node matching the template's node selector.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPlacement;

impl NodePlacement for DefaultPlacement {
    fn should_run(&self, node: &Node, ds: &DaemonSet) -> Result<bool, PlacementError> {
        Ok(!node.spec.unschedulable
            && ds
                .spec
                .template
                .spec
                .node_selector
                .iter()
                .all(|(k, v)| node.meta().labels.get(k) == Some(v)))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("placement predicate failed: {0}")]
    Placement(#[from] PlacementError),
    #[error("invalid maxUnavailable value: {0}")]
    MaxUnavailable(#[from] intstr::ParseError),
    #[error("failed to delete {} pod(s)", .0.len())]
    Delete(Vec<client::Error>),
}

/// Hash of a pod template: FNV-1a over its canonical JSON rendering.
///
/// Recorded on pods under [`TEMPLATE_HASH_LABEL`] at creation time, and
/// compared on every planning pass to tell old pods from new ones.
pub fn template_hash(template: &PodTemplateSpec) -> String {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let bytes = serde_json::to_vec(template).expect("pod templates always serialize");
    let mut hash = OFFSET_BASIS;
    for byte in bytes {
        hash = (hash ^ u64::from(byte)).wrapping_mul(PRIME);
    }
    format!("{hash:x}")
}

/// Whether `pod` was created from the template with the given hash.
pub fn is_pod_updated(hash: &str, pod: &Pod) -> bool {
    pod.meta().labels.get(TEMPLATE_HASH_LABEL).map(String::as_str) == Some(hash)
}

/// Plans and applies rolling updates for [`DaemonSet`]s.
pub struct DaemonSetUpdateController<C, P = DefaultPlacement> {
    client: Arc<C>,
    placement: P,
    ds_store: Store<DaemonSet>,
    pod_store: Store<Pod>,
    node_store: Store<Node>,
    queue: WorkQueue<ObjectRef>,
    config: Config,
}

impl<C, P> DaemonSetUpdateController<C, P>
where
    C: PodClient,
    P: NodePlacement,
{
    pub fn new(
        client: Arc<C>,
        placement: P,
        ds_store: Store<DaemonSet>,
        pod_store: Store<Pod>,
        node_store: Store<Node>,
        config: Config,
    ) -> Self {
        Self {
            client,
            placement,
            ds_store,
            pod_store,
            node_store,
            queue: WorkQueue::new(),
            config,
        }
    }

    /// All pods owned by `ds`, partitioned into `(new, old)` by template hash.
    ///
    /// Pods are ordered by name so that planning decisions are deterministic
    /// regardless of cache enumeration order.
    fn daemon_pods(&self, ds: &DaemonSet) -> (Vec<Arc<Pod>>, Vec<Arc<Pod>>) {
        let hash = template_hash(&ds.spec.template);
        let namespace = ds.namespace();
        let mut pods: Vec<_> = self
            .pod_store
            .state()
            .into_iter()
            .filter(|pod| {
                pod.namespace() == namespace
                    && ds
                        .spec
                        .selector
                        .iter()
                        .all(|(k, v)| pod.meta().labels.get(k) == Some(v))
            })
            .collect();
        pods.sort_by_key(|pod| pod.name_any());
        pods.into_iter().partition(|pod| is_pod_updated(&hash, pod))
    }

    /// Resolve the unavailability budget and count what is already
    /// unavailable.
    ///
    /// Pods that should be scheduled but do not exist count as unavailable,
    /// as does every existing pod failing the availability predicate. A
    /// configured non-zero budget never resolves to zero; a literal `0` is
    /// respected.
    fn unavailable_numbers(
        &self,
        ds: &DaemonSet,
        all_pods: &[Arc<Pod>],
        now: DateTime<Utc>,
    ) -> Result<(i32, i32), Error> {
        let mut desired = 0;
        for node in self.node_store.state() {
            if self.placement.should_run(&node, ds)? {
                desired += 1;
            }
        }

        let mut num_unavailable = desired - all_pods.len() as i32;
        for pod in all_pods {
            if !is_pod_available(pod, ds.spec.min_ready_seconds, now) {
                num_unavailable += 1;
            }
        }

        let configured = ds
            .spec
            .update_strategy
            .rolling_update
            .as_ref()
            .map(|ru| ru.max_unavailable.clone())
            .unwrap_or(IntOrString::Int(1));
        let mut max_unavailable = configured.scaled_value(desired, true)?;
        if max_unavailable == 0 && configured != IntOrString::Int(0) {
            max_unavailable = 1;
        }
        Ok((max_unavailable, num_unavailable))
    }

    /// One rolling-update pass: delete old pods up to the unavailability
    /// budget.
    ///
    /// Old pods that are already unavailable are deleted unconditionally
    /// (they provide no value and consume no budget); available old pods are
    /// deleted in name order only while budget remains. A malformed budget
    /// aborts the pass without touching anything.
    pub async fn rolling_update(&self, ds: &DaemonSet, now: DateTime<Utc>) -> Result<(), Error> {
        let (new_pods, old_pods) = self.daemon_pods(ds);
        let all_pods: Vec<_> = old_pods.iter().chain(new_pods.iter()).cloned().collect();

        let (max_unavailable, mut num_unavailable) =
            match self.unavailable_numbers(ds, &all_pods, now) {
                Ok(numbers) => numbers,
                Err(error) => {
                    // never partially apply: without trustworthy numbers the
                    // pass does nothing, and the next event or resync retries
                    tracing::error!(
                        ds = %ObjectRef::from_obj(ds),
                        %error,
                        "could not get unavailable numbers, skipping pass"
                    );
                    return Ok(());
                }
            };

        let (old_available, old_unavailable): (Vec<_>, Vec<_>) = old_pods
            .into_iter()
            .partition(|pod| is_pod_available(pod, ds.spec.min_ready_seconds, now));

        let mut pods_to_delete = Vec::new();
        for pod in &old_unavailable {
            tracing::debug!(pod = %pod.name_any(), "marking unavailable old pod for deletion");
            pods_to_delete.push(pod.name_any());
        }
        for pod in &old_available {
            if num_unavailable >= max_unavailable {
                tracing::debug!(
                    num_unavailable,
                    max_unavailable,
                    "unavailability budget exhausted"
                );
                break;
            }
            tracing::debug!(pod = %pod.name_any(), "marking old pod for deletion");
            pods_to_delete.push(pod.name_any());
            num_unavailable += 1;
        }

        self.delete_pods(ds, pods_to_delete).await
    }

    /// Issue one deletion call per pod, collecting failures.
    ///
    /// A pod that is already gone is not a failure; anything else is
    /// aggregated and surfaced for a rate-limited retry of the whole pass.
    async fn delete_pods(&self, ds: &DaemonSet, names: Vec<String>) -> Result<(), Error> {
        let namespace = ds.namespace().unwrap_or_default();
        let mut failures = Vec::new();
        for name in names {
            if let Err(err) = self.client.delete_pod(&namespace, &name).await {
                if err.is_not_found() {
                    continue;
                }
                failures.push(err);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Delete(failures))
        }
    }

    pub async fn sync(&self, key: &ObjectRef) -> Result<(), Error> {
        // already deleted: the cascading pod cleanup is not ours to do
        let Some(cached) = self.ds_store.get(key) else {
            return Ok(());
        };
        let ds = (*cached).clone();
        self.rolling_update(&ds, Utc::now()).await
    }

    fn enqueue(&self, ds: &DaemonSet) {
        let key = ObjectRef::from_obj(ds);
        tracing::trace!(%key, "enqueueing");
        self.queue.add(key);
    }

    fn handle_event(&self, event: Event<DaemonSet>) {
        match event {
            Event::Applied(ds) => self.enqueue(&ds),
            Event::Deleted(_) => {}
            Event::Restarted(sets) => {
                for ds in &sets {
                    self.enqueue(ds);
                }
            }
        }
    }

    /// Drive the controller until `stop` fires or the event feed ends.
    ///
    /// `events` must be the post-reflector stream feeding the daemon-set
    /// [`Store`]; the pod and node stores are fed by their own reflectors
    /// and only need to be synced before workers start.
    pub async fn run<S>(self, events: S, stop: CancellationToken)
    where
        S: Stream<Item = Event<DaemonSet>>,
    {
        tracing::info!("starting daemon set update controller");

        let queue = self.queue.clone();
        let pump = async {
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                self.handle_event(event);
            }
            tracing::debug!("event feed closed");
        };
        let intake = async {
            tokio::select! {
                () = stop.cancelled() => {}
                () = pump => {}
            }
            queue.shut_down();
        };
        let workers = async {
            if wait_for_cache_sync(&self.ds_store, &stop).await
                && wait_for_cache_sync(&self.pod_store, &stop).await
                && wait_for_cache_sync(&self.node_store, &stop).await
            {
                let workers = self.config.workers.max(1);
                future::join_all((0..workers).map(|_| run_worker(&self.queue, &self))).await;
            }
        };
        future::join(intake, workers).await;
        tracing::info!("shutting down daemon set update controller");
    }
}

#[async_trait]
impl<C, P> Reconciler for DaemonSetUpdateController<C, P>
where
    C: PodClient,
    P: NodePlacement,
{
    type Error = Error;

    async fn sync(&self, key: &ObjectRef) -> Result<(), Error> {
        DaemonSetUpdateController::sync(self, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::{
        is_pod_updated, template_hash, DaemonSetUpdateController, DefaultPlacement, Error,
        TEMPLATE_HASH_LABEL,
    };
    use crate::controller::Config;
    use crate::reflector::{store, ObjectRef, Store, Writer};
    use crate::watcher::Event;
    use chrono::{TimeDelta, Utc};
    use futures::{stream, StreamExt};
    use rudder_core::apis::{
        Container, DaemonSet, Node, Pod, PodPhase, PodStatus, RollingUpdateStrategy,
        UpdateStrategy, POD_READY,
    };
    use rudder_core::conditions::{Condition, ConditionStatus};
    use rudder_core::{IntOrString, ObjectMeta};
    use rudder_test::FakeApi;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const NS: &str = "infra";

    fn daemon_set(max_unavailable: IntOrString) -> DaemonSet {
        let mut ds = DaemonSet {
            metadata: ObjectMeta {
                name: Some("agent".into()),
                namespace: Some(NS.into()),
                ..ObjectMeta::default()
            },
            ..DaemonSet::default()
        };
        ds.spec.selector = BTreeMap::from([("app".to_string(), "agent".to_string())]);
        ds.spec.template.labels = ds.spec.selector.clone();
        ds.spec.template.spec.containers = vec![Container {
            name: "agent".into(),
            image: "agent:v2".into(),
        }];
        ds.spec.update_strategy = UpdateStrategy {
            rolling_update: Some(RollingUpdateStrategy { max_unavailable }),
        };
        ds
    }

    fn pod(name: &str, ds: &DaemonSet, current: bool, ready: bool) -> Pod {
        let mut labels = ds.spec.selector.clone();
        let hash = if current {
            template_hash(&ds.spec.template)
        } else {
            "stale".to_string()
        };
        labels.insert(TEMPLATE_HASH_LABEL.to_string(), hash);
        let conditions = if ready {
            vec![Condition {
                last_transition_time: Some(Utc::now() - TimeDelta::hours(1)),
                ..Condition::new(POD_READY, ConditionStatus::True)
            }]
        } else {
            vec![]
        };
        Pod {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some(NS.into()),
                labels,
                ..ObjectMeta::default()
            },
            status: PodStatus {
                phase: PodPhase::Running,
                conditions,
            },
            ..Pod::default()
        }
    }

    fn node(name: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            ..Node::default()
        }
    }

    struct Fixture {
        controller: DaemonSetUpdateController<FakeApi<Pod>>,
        api: Arc<FakeApi<Pod>>,
        #[allow(dead_code)]
        writers: (Writer<DaemonSet>, Writer<Pod>, Writer<Node>),
    }

    fn fixture(ds: &DaemonSet, pods: Vec<Pod>, nodes: usize) -> Fixture {
        let api = Arc::new(FakeApi::default());
        let pods: Vec<_> = pods.into_iter().map(|pod| api.insert(pod)).collect();

        let (ds_reader, mut ds_writer): (Store<DaemonSet>, _) = store();
        ds_writer.apply_watcher_event(&Event::Restarted(vec![ds.clone()]));
        let (pod_reader, mut pod_writer): (Store<Pod>, _) = store();
        pod_writer.apply_watcher_event(&Event::Restarted(pods));
        let (node_reader, mut node_writer): (Store<Node>, _) = store();
        let nodes: Vec<_> = (0..nodes).map(|i| node(&format!("node-{i}"))).collect();
        node_writer.apply_watcher_event(&Event::Restarted(nodes));

        let controller = DaemonSetUpdateController::new(
            api.clone(),
            DefaultPlacement,
            ds_reader,
            pod_reader,
            node_reader,
            Config::default(),
        );
        Fixture {
            controller,
            api,
            writers: (ds_writer, pod_writer, node_writer),
        }
    }

    #[test]
    fn template_hashes_are_stable_and_spec_sensitive() {
        let ds = daemon_set(IntOrString::Int(1));
        let mut other = ds.clone();
        assert_eq!(
            template_hash(&ds.spec.template),
            template_hash(&other.spec.template)
        );
        other.spec.template.spec.containers[0].image = "agent:v3".into();
        assert_ne!(
            template_hash(&ds.spec.template),
            template_hash(&other.spec.template)
        );
    }

    #[test]
    fn pods_are_recognized_by_their_recorded_hash() {
        let ds = daemon_set(IntOrString::Int(1));
        let hash = template_hash(&ds.spec.template);
        assert!(is_pod_updated(&hash, &pod("a", &ds, true, true)));
        assert!(!is_pod_updated(&hash, &pod("b", &ds, false, true)));
        assert!(!is_pod_updated(&hash, &Pod::default()));
    }

    #[tokio::test]
    async fn percentage_budget_limits_deletions() {
        // desired=10, maxUnavailable=20% -> exactly 2 of the 10 available old
        // pods may be taken down this pass
        let ds = daemon_set(IntOrString::String("20%".into()));
        let pods = (0..10).map(|i| pod(&format!("p{i}"), &ds, false, true)).collect();
        let f = fixture(&ds, pods, 10);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert_eq!(f.api.deleted(), ["p0", "p1"]);
    }

    #[tokio::test]
    async fn unavailable_old_pods_are_always_deleted() {
        // budget is 0 thanks to two already-unavailable pods, but those two
        // cost nothing to remove
        let ds = daemon_set(IntOrString::Int(2));
        let pods = vec![
            pod("down-0", &ds, false, false),
            pod("down-1", &ds, false, false),
            pod("up-0", &ds, false, true),
            pod("up-1", &ds, false, true),
        ];
        let f = fixture(&ds, pods, 4);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert_eq!(f.api.deleted(), ["down-0", "down-1"]);
    }

    #[tokio::test]
    async fn missing_pods_consume_the_budget() {
        // 5 nodes want a pod but only 3 exist: 2 budget units are already
        // spent before any deletion
        let ds = daemon_set(IntOrString::Int(3));
        let pods = (0..3).map(|i| pod(&format!("p{i}"), &ds, false, true)).collect();
        let f = fixture(&ds, pods, 5);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert_eq!(f.api.deleted(), ["p0"]);
    }

    #[tokio::test]
    async fn new_pods_are_never_deleted() {
        let ds = daemon_set(IntOrString::Int(10));
        let pods = vec![
            pod("new-0", &ds, true, true),
            pod("old-0", &ds, false, true),
        ];
        let f = fixture(&ds, pods, 2);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert_eq!(f.api.deleted(), ["old-0"]);
    }

    #[tokio::test]
    async fn a_literal_zero_budget_deletes_nothing_available() {
        let ds = daemon_set(IntOrString::Int(0));
        let pods = (0..3).map(|i| pod(&format!("p{i}"), &ds, false, true)).collect();
        let f = fixture(&ds, pods, 3);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert!(f.api.deleted().is_empty());
    }

    #[tokio::test]
    async fn a_non_zero_percentage_never_rounds_to_a_zero_budget() {
        // 10% of 3 rounds up to 1 already; 10% of 0 desired would resolve to
        // 0, which the floor turns back into 1 — but with nothing running
        // the pass is a no-op anyway
        let ds = daemon_set(IntOrString::String("10%".into()));
        let pods = (0..3).map(|i| pod(&format!("p{i}"), &ds, false, true)).collect();
        let f = fixture(&ds, pods, 3);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert_eq!(f.api.deleted(), ["p0"]);
    }

    #[tokio::test]
    async fn a_malformed_budget_aborts_the_pass_without_deletions() {
        for bad in ["20", "abc%"] {
            let ds = daemon_set(IntOrString::String(bad.into()));
            let pods = (0..3)
                .map(|i| pod(&format!("p{i}"), &ds, false, true))
                .collect();
            let f = fixture(&ds, pods, 3);

            // swallowed: retrying cannot fix the spec
            f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
            assert!(f.api.deleted().is_empty());
        }
    }

    struct BrokenPlacement;

    impl super::NodePlacement for BrokenPlacement {
        fn should_run(
            &self,
            _: &Node,
            _: &DaemonSet,
        ) -> Result<bool, super::PlacementError> {
            Err(super::PlacementError("affinity rules unreadable".into()))
        }
    }

    #[tokio::test]
    async fn a_failing_placement_predicate_aborts_the_pass() {
        let ds = daemon_set(IntOrString::Int(2));
        let pods: Vec<_> = (0..3)
            .map(|i| pod(&format!("p{i}"), &ds, false, true))
            .collect();
        let f = fixture(&ds, pods, 3);
        let controller = DaemonSetUpdateController::new(
            f.api.clone(),
            BrokenPlacement,
            f.controller.ds_store.clone(),
            f.controller.pod_store.clone(),
            f.controller.node_store.clone(),
            Config::default(),
        );

        controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert!(f.api.deleted().is_empty());
    }

    #[tokio::test]
    async fn pods_inside_the_stability_window_count_as_unavailable() {
        let now = Utc::now();
        let mut ds = daemon_set(IntOrString::Int(1));
        ds.spec.min_ready_seconds = 600;
        let mut young = pod("young", &ds, false, true);
        young.status.conditions[0].last_transition_time = Some(now - TimeDelta::seconds(30));
        let settled = pod("settled", &ds, false, true);
        let f = fixture(&ds, vec![young, settled], 2);

        // "young" is unavailable (free to delete); the budget it already
        // consumes blocks deleting "settled"
        f.controller.rolling_update(&ds, now).await.unwrap();
        assert_eq!(f.api.deleted(), ["young"]);
    }

    #[tokio::test]
    async fn deletion_order_is_lexicographic_by_name() {
        let ds = daemon_set(IntOrString::Int(2));
        // insertion order deliberately scrambled; the cache enumeration order
        // is arbitrary either way
        let pods = vec![
            pod("zeta", &ds, false, true),
            pod("alpha", &ds, false, true),
            pod("mid", &ds, false, true),
        ];
        let f = fixture(&ds, pods, 3);

        f.controller.rolling_update(&ds, Utc::now()).await.unwrap();
        assert_eq!(f.api.deleted(), ["alpha", "mid"]);
    }

    #[tokio::test]
    async fn missing_daemon_set_is_benign() {
        let ds = daemon_set(IntOrString::Int(1));
        let f = fixture(&ds, vec![], 0);
        f.controller
            .sync(&ObjectRef::new("other").within(NS))
            .await
            .unwrap();
        assert!(f.api.deleted().is_empty());
    }

    #[tokio::test]
    async fn delete_failures_are_aggregated() {
        let ds = daemon_set(IntOrString::Int(3));
        let pods = (0..2).map(|i| pod(&format!("p{i}"), &ds, false, true)).collect();
        let f = fixture(&ds, pods, 2);
        f.api
            .fail_next(crate::client::Error::Service("cannot reach store".into()));

        let err = f.controller.rolling_update(&ds, Utc::now()).await.unwrap_err();
        match err {
            Error::Delete(failures) => assert_eq!(failures.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
        // the second deletion still went through
        assert_eq!(f.api.deleted(), ["p1"]);
    }

    /// The budget invariant, swept over small shapes: a pass never drives
    /// the unavailable count past the resolved budget.
    #[tokio::test]
    async fn deletions_never_exceed_the_remaining_budget() {
        for desired in 0..=4_usize {
            for max_unavailable in [
                IntOrString::Int(0),
                IntOrString::Int(1),
                IntOrString::Int(2),
                IntOrString::String("50%".into()),
            ] {
                for pattern in 0..(1_u32 << desired) {
                    let ds = daemon_set(max_unavailable.clone());
                    let pods: Vec<_> = (0..desired)
                        .map(|i| pod(&format!("p{i}"), &ds, false, pattern & (1 << i) != 0))
                        .collect();
                    let unavailable_before =
                        pods.iter().filter(|p| p.status.conditions.is_empty()).count() as i32;
                    let f = fixture(&ds, pods, desired);

                    f.controller.rolling_update(&ds, Utc::now()).await.unwrap();

                    let mut budget = max_unavailable
                        .scaled_value(desired as i32, true)
                        .unwrap();
                    if budget == 0 && max_unavailable != IntOrString::Int(0) {
                        budget = 1;
                    }
                    let deleted_available = f
                        .api
                        .deleted()
                        .len() as i32
                        - unavailable_before;
                    assert!(
                        deleted_available <= (budget - unavailable_before).max(0),
                        "desired={desired} max={max_unavailable:?} pattern={pattern:b}: \
                         deleted {deleted_available} available pods over a budget of {budget} \
                         with {unavailable_before} already unavailable"
                    );
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_plans_updates_from_the_feed_until_stopped() {
        let ds = daemon_set(IntOrString::Int(1));
        let api = Arc::new(FakeApi::default());
        let pods: Vec<_> = (0..2)
            .map(|i| api.insert(pod(&format!("p{i}"), &ds, false, true)))
            .collect();

        let (ds_reader, ds_writer): (Store<DaemonSet>, _) = store();
        let (pod_reader, mut pod_writer): (Store<Pod>, _) = store();
        pod_writer.apply_watcher_event(&Event::Restarted(pods));
        let (node_reader, mut node_writer): (Store<Node>, _) = store();
        node_writer.apply_watcher_event(&Event::Restarted(vec![node("n0"), node("n1")]));

        let controller = DaemonSetUpdateController::new(
            api.clone(),
            DefaultPlacement,
            ds_reader,
            pod_reader,
            node_reader,
            Config { workers: 2 },
        );
        let events =
            stream::iter(vec![Event::Restarted(vec![ds.clone()])]).chain(stream::pending());
        let rf = crate::reflector(ds_writer, events);

        let stop = CancellationToken::new();
        let run = tokio::spawn(controller.run(rf, stop.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while api.deleted().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("the controller should have deleted an old pod");

        stop.cancel();
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("run should return after the stop signal")
            .unwrap();

        assert_eq!(api.deleted(), ["p0"]);
    }
}
