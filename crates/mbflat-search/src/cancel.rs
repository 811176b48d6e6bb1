//! Cooperative cancellation and request coalescing.
//!
//! Concurrent searches from the same client key share a cancellation
//! token: a new arrival cancels the previous in-flight token, and
//! processing checks the token at loop boundaries and between the FTS and
//! fuzzy phases. The SQLite progress handler cooperates too, so a
//! cancelled query aborts inside the database engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// A shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Tracks the newest in-flight request per client key.
#[derive(Debug, Default)]
pub struct RequestCoalescer {
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl RequestCoalescer {
    /// Create an empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request for `key`, cancelling any previous one.
    pub fn begin(&self, key: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock();
        if let Some(previous) = active.insert(key.to_string(), token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Clear the entry for `key`, but only if `token` is still its
    /// current occupant — a newer request must not be evicted by an older
    /// one finishing late.
    pub fn finish(&self, key: &str, token: &CancellationToken) {
        let mut active = self.active.lock();
        if active.get(key).is_some_and(|current| current.same_as(token)) {
            active.remove(key);
        }
    }

    /// Number of in-flight client keys.
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    /// Whether no requests are in flight.
    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }
}
