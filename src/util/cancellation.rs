use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative cancellation: polled once per unit of search work, never
/// preemptive.
pub trait CancellationToken: Sync {
    fn is_cancellation_requested(&self) -> bool;
}

pub struct NeverCancelToken;

impl CancellationToken for NeverCancelToken {
    fn is_cancellation_requested(&self) -> bool {
        false
    }
}

pub struct AtomicCancellationToken {
    cancelled: AtomicBool,
}

impl AtomicCancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Default for AtomicCancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken for AtomicCancellationToken {
    fn is_cancellation_requested(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Trips once a wall-clock budget has elapsed.
pub struct DeadlineToken {
    deadline: Instant,
}

impl DeadlineToken {
    pub fn after(budget: std::time::Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }
}

impl CancellationToken for DeadlineToken {
    fn is_cancellation_requested(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn atomic_token_trips_once_cancelled() {
        let token = AtomicCancellationToken::new();
        assert!(!token.is_cancellation_requested());
        token.cancel();
        assert!(token.is_cancellation_requested());
    }

    #[test]
    fn deadline_token_trips_after_budget() {
        let token = DeadlineToken::after(Duration::from_millis(0));
        assert!(token.is_cancellation_requested());

        let patient = DeadlineToken::after(Duration::from_secs(3600));
        assert!(!patient.is_cancellation_requested());
    }
}
