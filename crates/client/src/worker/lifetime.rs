//! Lifetime extension for lifecycle events.
//!
//! The host may stop a worker as soon as an event handler returns. Work
//! registered through [`ExtendableEvent::wait_until`] is what the host waits
//! for before it considers the event finished; anything spawned outside of it
//! can be cut off mid-flight.

use futures_util::future::{BoxFuture, FutureExt, join_all};
use std::future::Future;
use std::sync::Mutex;

/// An install or activate event whose lifetime handlers can extend.
pub struct ExtendableEvent<T = ()> {
    pending: Mutex<Vec<BoxFuture<'static, T>>>,
}

impl<T: Send + 'static> Default for ExtendableEvent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ExtendableEvent<T> {
    pub fn new() -> Self {
        Self { pending: Mutex::new(Vec::new()) }
    }

    /// Keep the event alive until `work` completes.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        match self.pending.lock() {
            Ok(mut pending) => pending.push(work.boxed()),
            Err(poisoned) => poisoned.into_inner().push(work.boxed()),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    /// Drive every registered piece of work to completion, returning their
    /// outputs in registration order.
    pub async fn settle(self) -> Vec<T> {
        let pending = self.pending.into_inner().unwrap_or_else(|p| p.into_inner());
        join_all(pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settle_waits_for_all_work() {
        let done = Arc::new(AtomicUsize::new(0));
        let event = ExtendableEvent::new();

        for delay in [30u64, 10, 20] {
            let done = Arc::clone(&done);
            event.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(event.pending(), 3);

        event.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_settle_preserves_registration_order() {
        let event = ExtendableEvent::new();
        event.wait_until(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "slow"
        });
        event.wait_until(async { "fast" });

        assert_eq!(event.settle().await, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_settle_without_work() {
        let event: ExtendableEvent<()> = ExtendableEvent::new();
        assert!(event.settle().await.is_empty());
    }
}
