//! Request identifiers for control-channel commands.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic, thread-safe request-id source shared by every display.
///
/// Guarantees uniqueness across concurrent callers, not delivery order
/// across different control channels.
#[derive(Debug)]
pub struct RequestIdCounter {
    next: AtomicU64,
}

impl RequestIdCounter {
    /// Ids start at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for RequestIdCounter {
    fn default() -> Self {
        Self::new()
    }
}
