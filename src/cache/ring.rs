//! Bucket Ring Module
//!
//! Fixed-size circular sequence of expiration buckets (the timer wheel).

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::token::{ExpirationToken, TokenRef};

// == Bucket ==
/// Tokens released together on one tick.
#[derive(Debug, Default)]
pub struct Bucket {
    tokens: HashSet<TokenRef>,
}

impl Bucket {
    /// Adds an owning reference. Returns false if this token is already held.
    pub fn insert(&mut self, token: Arc<ExpirationToken>) -> bool {
        self.tokens.insert(TokenRef(token))
    }

    /// Number of distinct tokens held.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

// == Bucket Ring ==
/// Circular array of buckets with a cursor marking the current slot.
///
/// A token inserted at offset `n` from the cursor is released by the
/// `n`-th following call to [`BucketRing::advance`]. Offset 0 is the slot
/// that was just released and never receives tokens, so the farthest
/// horizon is `capacity - 1` ticks.
#[derive(Debug)]
pub struct BucketRing {
    slots: Vec<Bucket>,
    cursor: usize,
}

impl BucketRing {
    // == Constructor ==
    /// Creates a ring of `capacity` empty buckets.
    ///
    /// # Panics
    /// Panics if `capacity < 2`, since no offset could be scheduled.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "bucket ring needs at least two slots");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Bucket::default);
        Self { slots, cursor: 0 }
    }

    /// Number of slots in the ring.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    // == Insert ==
    /// Adds `token` to the bucket `offset` ticks ahead of the cursor.
    ///
    /// # Panics
    /// Panics if `offset` is 0 or not below the capacity.
    pub fn insert(&mut self, offset: usize, token: Arc<ExpirationToken>) -> bool {
        let capacity = self.capacity();
        assert!(
            offset > 0 && offset < capacity,
            "bucket offset {} out of range 1..{}",
            offset,
            capacity
        );
        let index = (self.cursor + offset) % capacity;
        self.slots[index].insert(token)
    }

    // == Advance ==
    /// Moves the cursor one slot and detaches that slot's bucket, leaving a
    /// fresh empty one in its place.
    ///
    /// The caller decides where the returned bucket is dropped; its tokens
    /// fire at that point.
    pub fn advance(&mut self) -> Bucket {
        self.cursor = (self.cursor + 1) % self.slots.len();
        std::mem::take(&mut self.slots[self.cursor])
    }

    /// Total owning references held across all buckets.
    pub fn pending(&self) -> usize {
        self.slots.iter().map(Bucket::len).sum()
    }
}
