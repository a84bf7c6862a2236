//! Wheel Cache - A concurrent expiring key-value cache
//!
//! Entries expire on a bucketed timer wheel: renewing an entry is an O(1)
//! insertion into a later bucket, and each tick releases one bucket.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheMap;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{ThreadTicker, TickDriver, TickHandle, TokioTicker};
