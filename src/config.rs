//! Configuration Module
//!
//! Handles loading the wheel geometry and server settings from environment variables.

use std::env;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tick period of the timer wheel in milliseconds
    pub tick_interval_ms: u64,
    /// Longest representable TTL in seconds; larger TTLs are clamped to it
    pub ttl_limit: u64,
    /// Default TTL in seconds for entries set without an explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TICK_INTERVAL_MS` - Wheel tick period in milliseconds (default: 1000)
    /// - `TTL_LIMIT` - Maximum TTL in seconds (default: 3600)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval_ms: parse_var("TICK_INTERVAL_MS").unwrap_or(defaults.tick_interval_ms),
            ttl_limit: parse_var("TTL_LIMIT").unwrap_or(defaults.ttl_limit),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Tick period as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Maximum TTL as a `Duration`.
    pub fn ttl_limit(&self) -> Duration {
        Duration::from_secs(self.ttl_limit)
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            ttl_limit: 3600,
            default_ttl: 300,
            server_port: 3000,
        }
    }
}
