//! `SingleFlightCoordinator` (spec §4.4): coalesces concurrent identical
//! requests into one producer call, fanning the result out to every waiter.
//!
//! Lock discipline is the load-bearing property here, grounded in
//! `fraiseql-observers::dedup::DeduplicationStore`: the in-flight map's lock
//! is held only long enough to register or look up a waiter, never across
//! the producer invocation itself, so one slow producer never blocks
//! unrelated keys.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};

/// Default per spec §4.4: "a single-flight call that outlives 60s is
/// abandoned by its followers".
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleFlightError {
    #[error("single-flight wait timed out")]
    Timeout,
    #[error("leader dropped its result before broadcasting")]
    LeaderDropped,
}

pub struct SingleFlightCoordinator<T, E> {
    inflight: Mutex<HashMap<String, broadcast::Sender<Arc<Result<T, E>>>>>,
    timeout: Duration,
}

impl<T, E> Default for SingleFlightCoordinator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl<T, E> SingleFlightCoordinator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { inflight: Mutex::new(HashMap::new()), timeout }
    }

    /// Runs `producer` for `key` if no call is already in flight; otherwise
    /// waits for the in-flight call's result. Returns the result plus
    /// whether this caller was the leader (the one that actually ran
    /// `producer`) — callers use this to decide whether to record a cache
    /// miss or a coalesced hit.
    pub async fn execute<F, Fut>(&self, key: &str, producer: F) -> (Result<Arc<Result<T, E>>, SingleFlightError>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = self.inflight.lock().await;
        if let Some(sender) = guard.get(key) {
            let mut receiver = sender.subscribe();
            drop(guard);
            let result = match tokio::time::timeout(self.timeout, receiver.recv()).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(_)) => Err(SingleFlightError::LeaderDropped),
                Err(_) => Err(SingleFlightError::Timeout),
            };
            return (result, false);
        }

        let (sender, _receiver) = broadcast::channel(1);
        guard.insert(key.to_string(), sender.clone());
        drop(guard);

        let outcome = Arc::new(producer().await);
        let _ = sender.send(outcome.clone());

        self.inflight.lock().await.remove(key);
        (Ok(outcome), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_calls_coalesce_into_one_producer_invocation() {
        let coordinator: Arc<SingleFlightCoordinator<u32, String>> = Arc::new(SingleFlightCoordinator::default());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .execute("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(42u32)
                    })
                    .await
            }));
        }

        let mut leaders = 0;
        for handle in handles {
            let (result, was_leader) = handle.await.unwrap();
            assert_eq!(*result.unwrap(), Ok(42));
            if was_leader {
                leaders += 1;
            }
        }

        assert_eq!(leaders, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let coordinator: SingleFlightCoordinator<u32, String> = SingleFlightCoordinator::default();

        let (a, a_leader) = coordinator.execute("a", || async { Ok::<_, String>(1u32) }).await;
        let (b, b_leader) = coordinator.execute("b", || async { Ok::<_, String>(2u32) }).await;

        assert_eq!(*a.unwrap(), Ok(1));
        assert_eq!(*b.unwrap(), Ok(2));
        assert!(a_leader && b_leader);
    }
}
