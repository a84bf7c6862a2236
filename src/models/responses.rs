//! Response bodies for the key and wheel endpoints

use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheStats;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A key and its current value
#[derive(Debug, Clone, Serialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: String,
}

impl ValueResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// When a key will be released if nobody touches it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryInfo {
    /// Timeout the entry actually lives by, in milliseconds
    pub ttl_ms: u64,
    /// Wheel ticks until release
    pub ticks: usize,
    /// True when the requested timeout exceeded the wheel's limit
    pub clamped: bool,
}

impl ExpiryInfo {
    pub fn new(requested: Duration, effective: Duration, ticks: usize) -> Self {
        Self {
            ttl_ms: millis(effective),
            ticks,
            clamped: effective < requested,
        }
    }
}

/// Reply to a put or touch: the key's expiry after the write, `null` when
/// the key is permanent.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryResponse {
    pub key: String,
    pub expiry: Option<ExpiryInfo>,
}

impl ExpiryResponse {
    pub fn new(key: impl Into<String>, expiry: Option<ExpiryInfo>) -> Self {
        Self {
            key: key.into(),
            expiry,
        }
    }
}

/// Fixed geometry of the timer wheel
#[derive(Debug, Clone, Serialize)]
pub struct WheelInfo {
    pub tick_interval_ms: u64,
    pub ttl_limit_ms: u64,
    pub buckets: usize,
}

impl WheelInfo {
    pub fn new(interval: Duration, limit: Duration, buckets: usize) -> Self {
        Self {
            tick_interval_ms: millis(interval),
            ttl_limit_ms: millis(limit),
            buckets,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub total_entries: usize,
    /// Token references waiting in the wheel
    pub pending: usize,
    pub hit_rate: f64,
    pub wheel: WheelInfo,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, wheel: WheelInfo) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            pending: stats.pending,
            wheel,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub entries: usize,
}

impl HealthResponse {
    pub fn healthy(entries: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            entries,
        }
    }
}
