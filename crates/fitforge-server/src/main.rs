//! FitForge orchestration server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fitforge_core::collaborators::{ChatModel, ExternalCatalog, ModelError, PersistenceStore};
use fitforge_core::testing::{FakeExternalCatalog, InMemoryPersistenceStore};
use fitforge_server::{AppState, RuntimeConfig, Server};

#[derive(Parser, Debug)]
#[command(name = "fitforge-server", version, about = "FitForge orchestration & caching server")]
struct Cli {
    /// Path to a TOML config file; falls back to `FITFORGE_CONFIG`, then
    /// `./fitforge.toml`, then the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Placeholder chat model wired in until a real vendor client is selected —
/// the orchestration core only depends on the `ChatModel` trait (spec §1),
/// so swapping this for a production client never touches `fitforge-core`.
struct UnconfiguredChatModel;

#[async_trait::async_trait]
impl ChatModel for UnconfiguredChatModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String, ModelError> {
        Err(ModelError::Unavailable("no ChatModel implementation configured".into()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::load_with_path(cli.config.as_deref())?;

    fitforge_server::init_tracing(&config.logging);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting fitforge-server");

    let persistence: Arc<dyn PersistenceStore> = Arc::new(InMemoryPersistenceStore::new());
    let chat_model: Arc<dyn ChatModel> = Arc::new(UnconfiguredChatModel);
    let catalog: Arc<dyn ExternalCatalog> = Arc::new(FakeExternalCatalog::with_items(Vec::new()));

    tracing::warn!(
        "using in-memory PersistenceStore and a stub ChatModel/ExternalCatalog — \
         wire production implementations before deploying"
    );

    let state = AppState::connect(&config, persistence, chat_model, catalog).await?;
    Server::new(config, state).run().await?;

    Ok(())
}
