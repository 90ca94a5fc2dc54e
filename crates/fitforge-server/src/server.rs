//! Router assembly and the serve loop (grounded in
//! `fraiseql-server::runtime_server::RuntimeServer`).

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::RuntimeConfig;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),
    #[error("failed to bind listener: {0}")]
    Bind(std::io::Error),
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

pub struct Server {
    config: RuntimeConfig,
    state: AppState,
}

impl Server {
    #[must_use]
    pub fn new(config: RuntimeConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = self.state.shutdown.clone();

        let router = self.build_router();
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port).parse()?;

        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        tracing::info!(%addr, "fitforge-server listening");

        let shutdown_timeout = Duration::from_secs(self.config.server.shutdown_timeout_secs);
        let signal_handler = shutdown.clone();
        let graceful = async move {
            shutdown_signal(signal_handler.clone()).await;
            signal_handler.wait_for_requests(shutdown_timeout).await;
        };

        axum::serve(listener, router).with_graceful_shutdown(graceful).await.map_err(ServerError::Serve)
    }

    fn build_router(&self) -> Router {
        let router = crate::routes::build_router(self.state.clone());
        Self::apply_middleware(router, &self.config)
    }

    fn apply_middleware(router: Router, config: &RuntimeConfig) -> Router {
        router
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!("http_request", method = %request.method(), uri = %request.uri())
                }),
            )
            .layer(CompressionLayer::new())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
    }
}
