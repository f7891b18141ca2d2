//! Cooperative cancellation for processing runs
//!
//! A run looks at the token at two points: once before a Full run deletes
//! the provider's committed data, and before every verbatim page is read.
//! Nothing inside a batch looks at it, so the index only ever holds whole
//! batches: a run cancelled after its third commit keeps exactly three
//! batches and ends as `Canceled`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same state, so the token
/// a coordinator hands to each provider task stops all of them, and the
/// CLI's Ctrl-C handler only needs one clone.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation. Idempotent. Runs notice it at their next
    /// page boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let worker = token.clone();
        token.cancel();
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
