//! Cache Map Module
//!
//! Expiring key-value map that schedules expirations on a bucketed timer wheel.
//!
//! Two locks guard the shared state: the entry store lock and the ring lock.
//! They are always taken in that order (store, then ring). Tokens fire only
//! after the ring lock has been released, because their action takes the
//! store lock.

use std::collections::hash_map::Entry as MapEntry;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::cache::entry::ExpiryCallback;
use crate::cache::ring::BucketRing;
use crate::cache::store::{EntryStore, StoreState};
use crate::cache::token::ExpirationToken;
use crate::cache::{CacheEntry, CacheStats, MAX_RING_CAPACITY};
use crate::error::{CacheError, Result};
use crate::tasks::{TickDriver, TickHandle};

// == Cache Map ==
/// Concurrent map whose entries expire after a per-entry timeout.
///
/// Every access to an entry with a positive timeout pushes its expiry back
/// to a full timeout from now (sliding expiration). Expiry resolution is one
/// tick: an entry with timeout `t` is removed by the `floor(t / interval) + 1`-th
/// tick after its last access. Timeouts longer than `limit` are clamped to the
/// wheel's horizon.
pub struct CacheMap<K, V> {
    // Field order is drop order: stop ticking, release the store so pending
    // tokens resolve to nothing, then drop the ring.
    ticker: Option<TickHandle>,
    store: Arc<EntryStore<K, V>>,
    ring: Arc<Mutex<BucketRing>>,
    interval: Duration,
    limit: Duration,
    capacity: usize,
}

impl<K, V> CacheMap<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    // == Constructor ==
    /// Creates a map whose wheel is advanced by calling [`CacheMap::tick`].
    ///
    /// # Arguments
    /// * `interval` - Tick period; the expiry resolution
    /// * `limit` - Longest representable timeout
    ///
    /// # Errors
    /// `InvalidConfig` if `interval` is zero, `limit` is shorter than
    /// `interval`, or the wheel would need more than `MAX_RING_CAPACITY` slots.
    pub fn new(interval: Duration, limit: Duration) -> Result<Self> {
        let capacity = ring_capacity(interval, limit)?;
        Ok(Self {
            ticker: None,
            store: Arc::new(EntryStore::new()),
            ring: Arc::new(Mutex::new(BucketRing::new(capacity))),
            interval,
            limit,
            capacity,
        })
    }

    /// Creates a map and registers its tick with `driver`.
    ///
    /// The driver only keeps a weak reference to the wheel; dropping the map
    /// cancels the registration.
    pub fn with_driver<D>(driver: &D, interval: Duration, limit: Duration) -> Result<Self>
    where
        D: TickDriver + ?Sized,
    {
        let mut map = Self::new(interval, limit)?;
        let ring = Arc::downgrade(&map.ring);
        let handle = driver.run_every(
            interval,
            Box::new(move || {
                if let Some(ring) = ring.upgrade() {
                    rotate(&ring);
                }
            }),
        )?;
        map.ticker = Some(handle);
        Ok(map)
    }

    // == Insert ==
    /// Stores `value` under `key`, replacing any previous value, timeout and
    /// callback.
    ///
    /// A zero `timeout` makes the entry permanent: any pending expiry is
    /// neutralized and `on_expire` is discarded.
    pub fn insert(&self, key: K, value: V, timeout: Duration, on_expire: Option<ExpiryCallback>) {
        let mut state = self.store.lock();
        let entry = match state.entries.entry(key.clone()) {
            MapEntry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                entry.value = value;
                entry
            }
            MapEntry::Vacant(vacant) => vacant.insert(CacheEntry::new(value)),
        };

        if timeout.is_zero() {
            entry.make_permanent(self.store.next_generation());
        } else {
            entry.timeout = timeout;
            entry.callback = on_expire;
            self.schedule(&key, entry);
        }
    }

    /// Stores a value that never expires on its own.
    pub fn insert_forever(&self, key: K, value: V) {
        self.insert(key, value, Duration::ZERO, None);
    }

    // == Get Or Create ==
    /// Returns a mutable guard on the value for `key`, inserting a
    /// default-valued permanent entry if absent.
    ///
    /// Renews the entry's expiry if it has a timeout. The guard holds the
    /// store lock: drop it before calling the map again.
    pub fn get_or_create(&self, key: K) -> MappedMutexGuard<'_, V>
    where
        V: Default,
    {
        MutexGuard::map(self.store.lock(), |state| {
            let StoreState { entries, stats } = state;
            let entry = match entries.entry(key.clone()) {
                MapEntry::Occupied(occupied) => {
                    stats.record_lookup(true);
                    occupied.into_mut()
                }
                MapEntry::Vacant(vacant) => {
                    stats.record_lookup(false);
                    vacant.insert(CacheEntry::default())
                }
            };
            if entry.expires() {
                self.schedule(&key, entry);
            }
            &mut entry.value
        })
    }

    // == Contains ==
    /// Returns whether `key` is present, renewing its expiry if it has one.
    pub fn contains(&self, key: &K) -> bool {
        self.touch(key, |_| ()).is_some()
    }

    // == Get ==
    /// Returns a clone of the value for `key`, renewing its expiry if it has one.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.touch(key, |entry| entry.value.clone())
    }

    /// Renews `key` and returns its timeout, or `None` if absent.
    ///
    /// A zero timeout means the entry is permanent.
    pub fn renew(&self, key: &K) -> Option<Duration> {
        self.touch(key, |entry| entry.timeout)
    }

    // == Erase ==
    /// Removes `key` without running its expiry callback.
    ///
    /// Returns true if the key was present. A pending token for the key
    /// finds nothing to remove when it eventually fires.
    pub fn erase(&self, key: &K) -> bool {
        let removed = self.store.lock().entries.remove(key);
        removed.is_some()
    }

    // == Tick ==
    /// Advances the wheel by one slot and fires every token whose last
    /// owning bucket was just released.
    ///
    /// Returns the number of token references released. Called by the tick
    /// driver; exposed for maps built with [`CacheMap::new`].
    pub fn tick(&self) -> usize {
        rotate(&self.ring)
    }

    // == Accessors ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().entries.is_empty()
    }

    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = {
            let state = self.store.lock();
            let mut stats = state.stats.clone();
            stats.total_entries = state.entries.len();
            stats
        };
        stats.pending = self.ring.lock().pending();
        stats
    }

    /// Tick period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Longest representable timeout.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Number of slots in the wheel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Timeout an entry actually lives by: `timeout` capped at `limit`.
    pub fn effective_timeout(&self, timeout: Duration) -> Duration {
        timeout.min(self.limit)
    }

    /// Ticks after which an entry accessed now with `timeout` is released,
    /// or `None` for a permanent (zero) timeout.
    pub fn expiry_ticks(&self, timeout: Duration) -> Option<usize> {
        (!timeout.is_zero()).then(|| self.offset_for(timeout))
    }

    /// Looks up `key`, renews its expiry and projects the entry through `f`,
    /// all in one critical section.
    fn touch<R>(&self, key: &K, f: impl FnOnce(&CacheEntry<V>) -> R) -> Option<R> {
        let mut state = self.store.lock();
        let StoreState { entries, stats } = &mut *state;
        let result = entries.get_mut(key).map(|entry| {
            if entry.expires() {
                self.schedule(key, entry);
            }
            f(entry)
        });
        stats.record_lookup(result.is_some());
        result
    }

    // == Schedule ==
    /// Places the entry's token in the bucket matching its timeout, creating
    /// a new token if the previous one has already fired.
    ///
    /// Runs under the store lock; takes the ring lock only for the insertion.
    fn schedule(&self, key: &K, entry: &mut CacheEntry<V>) {
        debug_assert!(entry.expires(), "scheduling an entry without a timeout");

        let offset = self.offset_for(entry.timeout);
        let token = match entry.token.upgrade() {
            Some(token) => token,
            None => {
                let generation = self.store.next_generation();
                let token = ExpirationToken::new(EntryStore::expiry_action(
                    &self.store,
                    key.clone(),
                    generation,
                ));
                entry.token = Arc::downgrade(&token);
                entry.generation = generation;
                token
            }
        };

        trace!(offset, generation = entry.generation, "Scheduled entry expiry");
        self.ring.lock().insert(offset, token);
    }

    /// Maps a timeout to a ring offset, clamped to the wheel's horizon.
    fn offset_for(&self, timeout: Duration) -> usize {
        let buckets = timeout.as_nanos() / self.interval.as_nanos() + 1;
        let horizon = (self.capacity - 1) as u128;
        buckets.min(horizon) as usize
    }
}

/// Detaches the next bucket under the ring lock and drops it after the lock
/// is released, firing any token it held the last reference to.
fn rotate(ring: &Mutex<BucketRing>) -> usize {
    let released = ring.lock().advance();
    let count = released.len();
    drop(released);

    if count > 0 {
        debug!(released = count, "Rotated timer wheel");
    }
    count
}

/// Computes `ceil(limit / interval) + 1`, the number of wheel slots.
fn ring_capacity(interval: Duration, limit: Duration) -> Result<usize> {
    if interval.is_zero() {
        return Err(CacheError::InvalidConfig(
            "tick interval must be positive".to_string(),
        ));
    }
    if limit < interval {
        return Err(CacheError::InvalidConfig(format!(
            "limit {:?} is shorter than tick interval {:?}",
            limit, interval
        )));
    }

    let ticks = limit.as_nanos().div_ceil(interval.as_nanos());
    match usize::try_from(ticks + 1) {
        Ok(capacity) if capacity <= MAX_RING_CAPACITY => Ok(capacity),
        _ => Err(CacheError::InvalidConfig(format!(
            "limit {:?} over interval {:?} needs more than {} buckets",
            limit, interval, MAX_RING_CAPACITY
        ))),
    }
}
