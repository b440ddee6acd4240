use anyhow::Result;
use logwarden_alert::clock::SystemClock;
use logwarden_alert::engine::Evaluator;
use logwarden_alert::scheduler::Scheduler;
use logwarden_notify::dispatcher::Dispatcher;
use logwarden_notify::plugin::ChannelRegistry;
use logwarden_storage::engine::SqliteStore;
use logwarden_storage::{AlertStore, LogStore};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use logwarden_server::config::ServerConfig;
use logwarden_server::seed;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("logwarden=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/server.toml");
    let config = if Path::new(config_path).exists() {
        ServerConfig::load(config_path)?
    } else {
        tracing::warn!(path = config_path, "Config file not found, using defaults");
        ServerConfig::default()
    };

    logwarden_common::id::init(config.machine_id, config.node_id);

    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = Path::new(&config.data_dir).join("logwarden.db");
    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!(path = %db_path.display(), "Storage opened");

    let registry = ChannelRegistry::default();
    let seeded = seed::seed_channels(store.as_ref(), &registry, &config.channels)?;
    if seeded > 0 {
        tracing::info!(count = seeded, "Notification channels seeded");
    }

    let dispatcher = Arc::new(Dispatcher::new(registry));
    let evaluator = Arc::new(Evaluator::new(
        store.clone() as Arc<dyn LogStore>,
        store.clone() as Arc<dyn AlertStore>,
        dispatcher,
        Arc::new(SystemClock),
    ));
    let scheduler = Scheduler::new(evaluator, config.tick_secs);

    let shutdown = CancellationToken::new();
    let scheduler_shutdown = shutdown.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");
    shutdown.cancel();
    scheduler_handle.await?;

    Ok(())
}
