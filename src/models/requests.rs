//! Request bodies for the key endpoints
//!
//! Keys travel in the path; bodies carry only the value and its timeout.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Longest key accepted, in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Rejects keys the server will not store.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key is {} bytes, longer than the {} byte maximum",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Body of `PUT /keys/:key`
///
/// `ttl` is in seconds. Absent means the server default; 0 means the key
/// never expires.
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl PutRequest {
    /// Requested timeout, falling back to `default` when none was given.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.ttl.map(Duration::from_secs).unwrap_or(default)
    }
}

/// Body of `POST /keys/:key/append`
#[derive(Debug, Clone, Deserialize)]
pub struct AppendRequest {
    /// Text added to the end of the stored value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_request_defaults_ttl() {
        let req: PutRequest = serde_json::from_str(r#"{"value": "hello"}"#).unwrap();
        assert_eq!(req.value, "hello");
        assert_eq!(req.timeout_or(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn test_put_request_zero_ttl_is_kept() {
        let req: PutRequest = serde_json::from_str(r#"{"value": "v", "ttl": 0}"#).unwrap();
        assert_eq!(req.timeout_or(Duration::from_secs(30)), Duration::ZERO);
    }

    #[test]
    fn test_validate_key_bounds() {
        assert!(validate_key("session:42").is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH)).is_ok());
        assert!(matches!(
            validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)),
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(validate_key("").is_err());
    }
}
