//! A deduplicating, rate-limited queue of reconciliation keys.
//!
//! The queue is the per-key mutual-exclusion mechanism of the runtime: a key
//! handed to a worker is not handed to a second worker until the first calls
//! [`WorkQueue::done`], and adds of an in-flight key are deferred until then
//! rather than dropped. This is what makes a reconciler's read-then-write
//! safe without any additional per-key locking.
use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(5);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1000);

/// Shared handle to a work queue.
///
/// Handles are cheap to clone; all clones refer to the same queue.
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    rate_limiter: RateLimiter<T>,
}

struct State<T> {
    /// Keys waiting to be handed to a worker, in arrival order.
    queue: VecDeque<T>,
    /// Keys that need processing: queued now, or deferred behind an
    /// in-flight run of the same key.
    dirty: AHashSet<T>,
    /// Keys currently held by a worker.
    processing: AHashSet<T>,
    shutting_down: bool,
}

impl<T> Default for WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_rate_limits(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    /// Queue with a custom retry backoff range.
    pub fn with_rate_limits(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    dirty: AHashSet::new(),
                    processing: AHashSet::new(),
                    shutting_down: false,
                }),
                notify: Notify::new(),
                rate_limiter: RateLimiter::new(base_delay, max_delay),
            }),
        }
    }

    /// Mark a key as needing reconciliation.
    ///
    /// A key already waiting is not queued twice; a key currently held by a
    /// worker is re-queued once that worker calls [`done`](Self::done).
    pub fn add(&self, item: T) {
        {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                return;
            }
            if !state.dirty.insert(item.clone()) {
                return;
            }
            if state.processing.contains(&item) {
                // deferred: done() will queue it again
                return;
            }
            state.queue.push_back(item);
        }
        self.inner.notify.notify_waiters();
    }

    /// Wait for the next key.
    ///
    /// Returns `None` once the queue has been shut down and drained; workers
    /// use this as their exit condition. The returned key is held exclusively
    /// until [`done`](Self::done) releases it.
    pub async fn get(&self) -> Option<T> {
        loop {
            let mut notified = std::pin::pin!(self.inner.notify.notified());
            // register before checking state, so an add between the check and
            // the await still wakes us
            notified.as_mut().enable();
            {
                let mut state = self.inner.state.lock();
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Release a key after processing it.
    ///
    /// If the key was re-added while in flight it goes back on the queue now.
    pub fn done(&self, item: &T) {
        let requeued = {
            let mut state = self.inner.state.lock();
            state.processing.remove(item);
            if state.dirty.contains(item) {
                state.queue.push_back(item.clone());
                true
            } else {
                false
            }
        };
        if requeued {
            self.inner.notify.notify_waiters();
        }
    }

    /// Queue a key after a delay.
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        if self.inner.state.lock().shutting_down {
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Queue a key for retry, backing off exponentially per key.
    pub fn add_rate_limited(&self, item: T) {
        let delay = self.inner.rate_limiter.next_delay(&item);
        tracing::trace!(?delay, "re-queueing with backoff");
        self.add_after(item, delay);
    }

    /// Reset the retry backoff for a key after a successful reconciliation.
    pub fn forget(&self, item: &T) {
        self.inner.rate_limiter.forget(item);
    }

    /// Number of retries currently recorded against a key.
    pub fn num_requeues(&self, item: &T) -> u32 {
        self.inner.rate_limiter.requeues(item)
    }

    /// Close the queue for new work.
    ///
    /// Already-queued keys are still handed out until the queue is empty;
    /// [`get`](Self::get) then returns `None`.
    pub fn shut_down(&self) {
        self.inner.state.lock().shutting_down = true;
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.state.lock().shutting_down
    }

    /// Keys waiting to be handed out (in-flight keys are not counted).
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-key exponential failure backoff: `base * 2^failures`, capped at `max`.
struct RateLimiter<T> {
    failures: Mutex<AHashMap<T, u32>>,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: Clone + Eq + Hash> RateLimiter<T> {
    fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            failures: Mutex::new(AHashMap::new()),
            base_delay,
            max_delay,
        }
    }

    fn next_delay(&self, item: &T) -> Duration {
        let mut failures = self.failures.lock();
        let count = failures.entry(item.clone()).or_insert(0);
        let exponent = *count;
        *count += 1;
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent.min(32)))
            .min(self.max_delay)
    }

    fn forget(&self, item: &T) {
        self.failures.lock().remove(item);
    }

    fn requeues(&self, item: &T) -> u32 {
        self.failures.lock().get(item).copied().unwrap_or(0)
    }
}
