pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod geo;
pub mod llm;
pub mod location;
pub mod models;
pub mod pipeline;
pub mod preferences;
pub mod provider;
pub mod server;
pub mod session;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::AppState;
use catalog::EventCatalog;
use config::ConfigStore;
use db::Store;
use llm::LlmRankingProvider;
use preferences::PreferenceStore;
use session::Session;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!(data_dir = ?utils::default_layout().root(), "starting LocalPulse");
    let config_store = ConfigStore::load();
    // Writes the file on first start so it can be edited by hand.
    config_store
        .update(|_| {})
        .map_err(anyhow::Error::msg)
        .context("failed to write config")?;
    let config = config_store.effective().map_err(anyhow::Error::msg)?;

    let store = tokio::task::spawn_blocking(Store::open_default)
        .await
        .context("store task failed")?
        .context("failed to open preference store")?;
    let preference_store = PreferenceStore::new(store);
    let preferences = preference_store.load();
    info!(
        liked = preferences.liked_event_ids.len(),
        "preferences loaded"
    );

    let provider = LlmRankingProvider::new(&config.llm).context("failed to build LLM client")?;
    info!(endpoint = %config.llm.endpoint, model = %config.llm.model, "ranking provider ready");

    let state = AppState::new(
        Session::new(EventCatalog::seeded(), preferences),
        Arc::new(provider),
        preference_store,
        config.fallback_location,
    );

    server::serve(Arc::new(state), config.port).await?;
    Ok(())
}
