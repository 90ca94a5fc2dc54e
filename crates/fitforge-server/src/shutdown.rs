//! Graceful shutdown (SPEC_FULL.md §3, grounded in
//! `fraiseql-server::operational::shutdown::ShutdownHandler`): track in-flight
//! requests, drain them after a SIGTERM/ctrl-c, then let `axum::serve` exit.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ShutdownHandler {
    shutdown_requested: Arc<AtomicBool>,
    in_flight_requests: Arc<AtomicU32>,
}

impl ShutdownHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            in_flight_requests: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    pub fn increment_requests(&self) {
        self.in_flight_requests.fetch_add(1, Ordering::AcqRel);
    }

    pub fn decrement_requests(&self) {
        self.in_flight_requests.fetch_sub(1, Ordering::AcqRel);
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u32 {
        self.in_flight_requests.load(Ordering::Acquire)
    }

    /// Polls until every in-flight request finishes or `timeout` elapses.
    pub async fn wait_for_requests(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.in_flight_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once either a SIGTERM or ctrl-c is received.
pub async fn shutdown_signal(handler: ShutdownHandler) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
    handler.request_shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_shutdown_state() {
        let handler = ShutdownHandler::new();
        assert!(!handler.is_shutdown_requested());
        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());
    }

    #[test]
    fn counts_in_flight_requests() {
        let handler = ShutdownHandler::new();
        handler.increment_requests();
        handler.increment_requests();
        assert_eq!(handler.in_flight_count(), 2);
        handler.decrement_requests();
        assert_eq!(handler.in_flight_count(), 1);
    }

    #[tokio::test]
    async fn wait_for_requests_returns_once_drained() {
        let handler = ShutdownHandler::new();
        handler.increment_requests();

        let waiter = handler.clone();
        let wait = tokio::spawn(async move { waiter.wait_for_requests(Duration::from_secs(5)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handler.decrement_requests();

        tokio::time::timeout(Duration::from_secs(2), wait).await.unwrap().unwrap();
    }
}
