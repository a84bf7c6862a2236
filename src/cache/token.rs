//! Expiration Token Module
//!
//! A reference-counted handle that runs its action when the last owner lets go.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Action run when a token is released for the last time.
pub type FireAction = Box<dyn FnOnce() + Send + Sync + 'static>;

// == Expiration Token ==
/// Runs its fire action exactly once, from `Drop`.
///
/// Buckets own tokens through `Arc`; entries observe them through `Weak`.
/// Dropping the final `Arc` is the only way to trigger the action, so a
/// token co-owned by several buckets fires when the last of them rotates out.
pub struct ExpirationToken {
    fire: Option<FireAction>,
}

impl ExpirationToken {
    // == Constructor ==
    /// Wraps `fire` in a new shared token.
    pub fn new<F>(fire: F) -> Arc<Self>
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Arc::new(Self {
            fire: Some(Box::new(fire)),
        })
    }
}

impl Drop for ExpirationToken {
    fn drop(&mut self) {
        if let Some(fire) = self.fire.take() {
            fire();
        }
    }
}

impl fmt::Debug for ExpirationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationToken")
            .field("armed", &self.fire.is_some())
            .finish()
    }
}

// == Token Ref ==
/// Owning token reference compared by allocation identity.
#[derive(Debug, Clone)]
pub(crate) struct TokenRef(pub(crate) Arc<ExpirationToken>);

impl PartialEq for TokenRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TokenRef {}

impl Hash for TokenRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}
