//! Cache Module
//!
//! Provides an in-memory map whose entries expire on a bucketed timer wheel.

mod entry;
mod map;
mod ring;
mod stats;
mod store;
mod token;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub(crate) use entry::CacheEntry;
pub use entry::ExpiryCallback;
pub use map::CacheMap;
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum number of wheel slots a map may allocate
pub const MAX_RING_CAPACITY: usize = 1 << 20;
