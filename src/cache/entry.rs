//! Cache Entry Module
//!
//! Defines the per-key record held by the entry store.

use std::fmt;
use std::sync::Weak;
use std::time::Duration;

use crate::cache::token::ExpirationToken;

/// Callback invoked when an entry is removed by expiry.
pub type ExpiryCallback = Box<dyn FnOnce() + Send + 'static>;

// == Cache Entry ==
/// A stored value plus its expiry bookkeeping.
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Configured lifetime; zero means the entry never expires on its own
    pub timeout: Duration,
    /// Run at most once, only when the entry expires
    pub(crate) callback: Option<ExpiryCallback>,
    /// Non-owning handle to the token currently scheduled for this key
    pub(crate) token: Weak<ExpirationToken>,
    /// Schedule identity accepted by this entry; stale tokens carry another one
    pub(crate) generation: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an unscheduled entry that never expires.
    pub fn new(value: V) -> Self {
        Self {
            value,
            timeout: Duration::ZERO,
            callback: None,
            token: Weak::new(),
            generation: 0,
        }
    }

    /// Returns true if the entry is subject to expiry.
    pub fn expires(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Returns true if a token for this entry is still held by the ring.
    pub fn is_scheduled(&self) -> bool {
        self.token.strong_count() > 0
    }

    /// Drops any pending schedule and callback, making the entry permanent.
    pub(crate) fn make_permanent(&mut self, generation: u64) {
        self.timeout = Duration::ZERO;
        self.callback = None;
        self.token = Weak::new();
        self.generation = generation;
    }
}

impl<V: Default> Default for CacheEntry<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: fmt::Debug> fmt::Debug for CacheEntry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("value", &self.value)
            .field("timeout", &self.timeout)
            .field("has_callback", &self.callback.is_some())
            .field("scheduled", &self.is_scheduled())
            .field("generation", &self.generation)
            .finish()
    }
}
