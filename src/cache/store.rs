//! Entry Store Module
//!
//! Lock-guarded key to entry mapping, plus the expiry action tokens run on release.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error};

use crate::cache::entry::ExpiryCallback;
use crate::cache::{CacheEntry, CacheStats};

// == Store State ==
/// Everything guarded by the entry store lock.
pub(crate) struct StoreState<K, V> {
    pub(crate) entries: HashMap<K, CacheEntry<V>>,
    pub(crate) stats: CacheStats,
}

// == Entry Store ==
/// Key-value storage shared between the cache map and its expiry tokens.
///
/// Tokens hold only a `Weak` reference, so once the owning map drops its
/// `Arc` every pending expiry becomes a no-op.
pub(crate) struct EntryStore<K, V> {
    state: Mutex<StoreState<K, V>>,
    generations: AtomicU64,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + 'static,
{
    // == Constructor ==
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                stats: CacheStats::new(),
            }),
            generations: AtomicU64::new(0),
        }
    }

    /// Acquires the store lock. Must never be called while the ring lock is held.
    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreState<K, V>> {
        self.state.lock()
    }

    /// Allocates a schedule identity. Never returns 0, the value fresh entries carry.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    // == Expiry Action ==
    /// Builds the action a token runs when its last bucket releases it.
    pub(crate) fn expiry_action(
        store: &Arc<Self>,
        key: K,
        generation: u64,
    ) -> impl FnOnce() + Send + Sync + 'static {
        let store: Weak<Self> = Arc::downgrade(store);
        move || {
            if let Some(store) = store.upgrade() {
                store.expire(&key, generation);
            }
        }
    }

    // == Expire ==
    /// Removes `key` if it still expires and still belongs to `generation`,
    /// then runs its callback outside the lock.
    ///
    /// Returns true if the entry was removed.
    pub(crate) fn expire(&self, key: &K, generation: u64) -> bool {
        let callback = {
            let mut state = self.lock();
            let current = matches!(
                state.entries.get(key),
                Some(entry) if entry.expires() && entry.generation == generation
            );
            if !current {
                return false;
            }
            state.stats.record_expiration();
            state.entries.remove(key).and_then(|entry| entry.callback)
        };

        debug!(generation, "Entry expired");
        if let Some(callback) = callback {
            run_callback(callback);
        }
        true
    }
}

/// Runs an expiry callback, containing any panic it raises.
fn run_callback(callback: ExpiryCallback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        error!(panic = message, "Expiry callback panicked after entry removal");
    }
}
