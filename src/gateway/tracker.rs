//! In-flight request tracking for one router instance.
//!
//! # Responsibilities
//! - Count requests currently executing against an instance
//! - Wake drain waiters when the count reaches zero
//!
//! # Design Decisions
//! - Guard-based: the count is released on drop, so a panicking or cancelled
//!   handler never leaks a slot
//! - Waiters are woken through [`Notify`] instead of polling

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TrackerInner {
    count: AtomicU64,
    idle: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    inner: Arc<TrackerInner>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more request. The returned guard releases it on drop.
    pub fn track(&self) -> InFlightGuard {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Resolve once no request is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before re-checking so a release in between is not lost.
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Releases one in-flight slot when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<TrackerInner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tracker_counts() {
        let tracker = InFlightTracker::new();
        assert_eq!(tracker.count(), 0);

        let guard1 = tracker.track();
        let guard2 = tracker.track();
        assert_eq!(tracker.count(), 2);

        drop(guard1);
        assert_eq!(tracker.count(), 1);
        drop(guard2);
        assert_eq!(tracker.count(), 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_empty() {
        tokio::time::timeout(Duration::from_millis(50), InFlightTracker::new().wait_idle())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_idle_wakes_on_last_release() {
        let tracker = InFlightTracker::new();
        let guard = tracker.track();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_idle().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
