//! HTTP surface for the FitForge orchestration & caching core: config
//! loading, the Redis-backed `KVStore`, graceful shutdown, and the
//! quota/leaderboard/health routes.

pub mod config;
pub mod redis_store;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use config::RuntimeConfig;
pub use server::{Server, ServerError};
pub use state::AppState;

pub fn init_tracing(logging: &config::LoggingConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    if logging.json {
        tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
    }
}
