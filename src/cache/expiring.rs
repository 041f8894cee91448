//! Expiring single-flight cache
//!
//! Keyed cache of fetch outcomes. Successes and failures are both cached, each
//! under its own TTL, and at most one fetch per key is in flight at a time.
//! Callers asking for a key that is already being fetched join that fetch and
//! receive the same outcome.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// A fetch shared by every caller waiting on the same key
type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

type Slots<V, E> = HashMap<String, Slot<V, E>>;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name used in log fields and metric labels
    pub name: &'static str,
    /// How long a successful outcome stays fresh
    pub success_ttl: Duration,
    /// How long a failed outcome stays fresh
    pub error_ttl: Duration,
    /// Maximum number of keys held at once (`None` = unbounded)
    pub capacity: Option<usize>,
    /// Maximum number of fetches running at once across all keys
    pub max_concurrent_fetches: Option<usize>,
}

impl CacheConfig {
    pub fn new(name: &'static str, success_ttl: Duration, error_ttl: Duration) -> Self {
        Self {
            name,
            success_ttl,
            error_ttl,
            capacity: None,
            max_concurrent_fetches: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = Some(limit);
        self
    }
}

/// Populated entry, replaced wholesale on refetch
struct CacheEntry<V, E> {
    outcome: Result<V, E>,
    created_at: Instant,
    ttl: Duration,
}

impl<V, E> CacheEntry<V, E> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

enum Slot<V, E> {
    Ready(CacheEntry<V, E>),
    InFlight { id: u64, flight: Flight<V, E> },
}

enum Lookup<V, E> {
    Hit(Result<V, E>),
    Join(Flight<V, E>),
    Miss,
}

struct Inner<V, E> {
    config: CacheConfig,
    slots: Mutex<Slots<V, E>>,
    next_flight_id: AtomicU64,
    fetch_permits: Option<Arc<Semaphore>>,
}

impl<V: Clone, E: Clone> Inner<V, E> {
    // Never held across an await, so a poisoned map is still consistent.
    fn slots(&self) -> MutexGuard<'_, Slots<V, E>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the outcome of flight `id`, unless the slot moved on without it
    fn complete(&self, key: &str, id: u64, outcome: &Result<V, E>) {
        let ttl = match outcome {
            Ok(_) => self.config.success_ttl,
            Err(_) => self.config.error_ttl,
        };

        let mut slots = self.slots();
        let owns_slot = matches!(
            slots.get(key),
            Some(Slot::InFlight { id: current, .. }) if *current == id
        );

        if !owns_slot {
            debug!(cache = self.config.name, key, "Discarding outcome of superseded fetch");
            return;
        }

        slots.insert(
            key.to_owned(),
            Slot::Ready(CacheEntry {
                outcome: outcome.clone(),
                created_at: Instant::now(),
                ttl,
            }),
        );
        trace!(cache = self.config.name, key, ok = outcome.is_ok(), ?ttl, "Stored fetch outcome");
    }

    fn abandon(&self, key: &str, id: u64) {
        let mut slots = self.slots();
        if matches!(slots.get(key), Some(Slot::InFlight { id: current, .. }) if *current == id) {
            slots.remove(key);
        }
    }

    fn purge_expired(&self, slots: &mut Slots<V, E>, now: Instant) -> usize {
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => entry.is_fresh(now),
            Slot::InFlight { .. } => true,
        });
        before - slots.len()
    }

    /// Free one slot when at capacity: stale entries go first, then the oldest
    /// ready entry. In-flight slots are never evicted.
    fn make_room(&self, slots: &mut Slots<V, E>, now: Instant) {
        let Some(capacity) = self.config.capacity else {
            return;
        };
        if slots.len() < capacity {
            return;
        }
        if self.purge_expired(slots, now) > 0 && slots.len() < capacity {
            return;
        }

        let oldest = slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Ready(entry) => Some((key, entry.created_at)),
                Slot::InFlight { .. } => None,
            })
            .min_by_key(|(_, created_at)| *created_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            debug!(cache = self.config.name, key = %key, "Evicting oldest entry");
            slots.remove(&key);
        }
    }
}

/// Keyed cache with success/error expiry and one fetch in flight per key
///
/// Cloning is cheap and yields a handle to the same cache.
pub struct ExpiringCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for ExpiringCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> ExpiringCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new(config: CacheConfig) -> Self {
        let fetch_permits = config
            .max_concurrent_fetches
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            inner: Arc::new(Inner {
                config,
                slots: Mutex::new(HashMap::new()),
                next_flight_id: AtomicU64::new(0),
                fetch_permits,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get the outcome for `key`, fetching it if no fresh entry exists
    ///
    /// `fetch` is only called on a miss. It runs on its own task, outside the
    /// cache lock, so it finishes and stores its outcome even if every caller
    /// waiting on it goes away. The error returned is exactly the one `fetch`
    /// produced. Dropping the returned future only stops this caller's wait.
    pub async fn get<F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let name = self.inner.config.name;

        let flight = {
            let mut slots = self.inner.slots();
            let now = Instant::now();

            let lookup = match slots.get(key) {
                Some(Slot::Ready(entry)) if entry.is_fresh(now) => {
                    Lookup::Hit(entry.outcome.clone())
                }
                Some(Slot::InFlight { flight, .. }) => Lookup::Join(flight.clone()),
                _ => Lookup::Miss,
            };

            match lookup {
                Lookup::Hit(outcome) => {
                    trace!(cache = name, key, "Cache hit");
                    record_lookup(name, "hit");
                    return outcome;
                }
                Lookup::Join(flight) => {
                    debug!(cache = name, key, "Joining in-flight fetch");
                    record_lookup(name, "join");
                    flight
                }
                Lookup::Miss => {
                    debug!(cache = name, key, "Cache miss, starting fetch");
                    record_lookup(name, "miss");

                    let id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                    let flight = self.start_flight(key, id, fetch);

                    if !slots.contains_key(key) {
                        self.inner.make_room(&mut slots, now);
                    }
                    slots.insert(
                        key.to_owned(),
                        Slot::InFlight {
                            id,
                            flight: flight.clone(),
                        },
                    );
                    flight
                }
            }
        };

        flight.await
    }

    fn start_flight<F, Fut>(&self, key: &str, id: u64, fetch: F) -> Flight<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        // Weak so a running fetch does not keep a dropped cache alive.
        let inner = Arc::downgrade(&self.inner);
        let permits = self.inner.fetch_permits.clone();
        let key = key.to_owned();

        let task = tokio::spawn(async move {
            let _permit = match permits {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            match AssertUnwindSafe(async move { fetch().await })
                .catch_unwind()
                .await
            {
                Ok(outcome) => {
                    if let Some(inner) = inner.upgrade() {
                        inner.complete(&key, id, &outcome);
                    }
                    outcome
                }
                Err(payload) => {
                    // Free the slot so the next caller starts over instead of
                    // joining a poisoned flight.
                    if let Some(inner) = inner.upgrade() {
                        inner.abandon(&key, id);
                    }
                    panic::resume_unwind(payload)
                }
            }
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
                // Only reachable while the runtime is shutting down
                Err(e) => panic!("cache fetch task did not complete: {e}"),
            }
        }
        .boxed()
        .shared()
    }

    /// Drop whatever the cache holds for `key`
    ///
    /// A fetch already in flight still resolves for its waiters, but its
    /// outcome is not stored.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.slots().remove(key).is_some()
    }

    /// Remove every stale entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let mut slots = self.inner.slots();
        self.inner.purge_expired(&mut slots, Instant::now())
    }

    /// Number of keys currently held, in flight or ready (stale included)
    pub fn len(&self) -> usize {
        self.inner.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodically purge stale entries in the background
    ///
    /// The task ends on its own once every handle to the cache is dropped.
    /// `every` must be non-zero.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let name = self.inner.config.name;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(inner) = inner.upgrade() else {
                    debug!(cache = name, "Cache dropped, stopping sweeper");
                    break;
                };

                let purged = {
                    let mut slots = inner.slots();
                    inner.purge_expired(&mut slots, Instant::now())
                };
                if purged > 0 {
                    debug!(cache = name, purged, "Swept expired entries");
                }
            }
        })
    }
}

fn record_lookup(cache: &'static str, result: &'static str) {
    metrics::counter!(
        "claims_gate_cache_lookups_total",
        "cache" => cache,
        "result" => result
    )
    .increment(1);
}
