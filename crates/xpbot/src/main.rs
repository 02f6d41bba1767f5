use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use xpbot_core::{
    config::Config,
    registry::{JsonFileStore, Registry},
};
use xpbot_rewards::RewardsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    xpbot_core::logging::init("xpbot")?;

    let cfg = Arc::new(Config::load()?);

    let store = JsonFileStore::new(&cfg.registry_file);
    let registry_path = store.path().display().to_string();
    let registry = Registry::load(Arc::new(store))
        .with_context(|| format!("failed to load registry from {registry_path}"))?;

    let rewards = Arc::new(RewardsClient::new(
        &cfg.rewards_api_url,
        cfg.rewards_timeout,
    )?);
    info!(url = %cfg.rewards_api_url, "rewards API");

    xpbot_telegram::router::run_polling(cfg, registry, rewards)
        .await
        .context("telegram bot failed")
}
