//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin
//! and writes `ResponseEnvelope` and `EventEnvelope` messages to stdout.
//! Notification requests reach the shell as `notification.*` events.
//!
//! All tracing output goes to stderr so that stdout remains a clean JSON
//! protocol channel.
//!
//! Configuration is read from `FESTIVAL_CONFIG` when set, otherwise from
//! the default config path. The lineup is read from `lineup_path` in the
//! config, or `lineup.json` next to the config file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use festival::host::handler::FestivalCommandHandler;
use festival::host::stdio::run_stdio_bridge;
use festival::notify::EventDispatcher;
use festival::storage::FsStore;
use festival::{FestivalApp, FestivalConfig, Lineup, SystemClock};

/// Broadcast capacity for dispatcher requests awaiting the event writer.
const DISPATCH_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("festival=info")),
        )
        .init();

    tracing::info!("festival-host starting");

    let config_path = std::env::var_os("FESTIVAL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(FestivalConfig::default_config_path);
    let config = FestivalConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let lineup_path = config.lineup_path.clone().unwrap_or_else(|| {
        config_path
            .parent()
            .map(|dir| dir.join("lineup.json"))
            .unwrap_or_else(|| PathBuf::from("lineup.json"))
    });
    let lineup = if lineup_path.exists() {
        Lineup::from_file(&lineup_path)
            .with_context(|| format!("loading lineup from {}", lineup_path.display()))?
    } else {
        tracing::warn!("no lineup at {}; starting empty", lineup_path.display());
        Lineup::default()
    };

    let data_dir = config.storage.resolved_data_dir();
    let store = FsStore::new(&data_dir)
        .with_context(|| format!("opening store at {}", data_dir.display()))?;
    tracing::info!("store at {}", data_dir.display());

    let dispatcher = Arc::new(EventDispatcher::new(DISPATCH_CAPACITY));
    let dispatch_events = dispatcher.subscribe();

    let app = FestivalApp::init(
        config,
        lineup,
        Arc::new(store),
        dispatcher,
        Arc::new(SystemClock),
    )
    .await
    .context("initialising festival app")?;

    run_stdio_bridge(FestivalCommandHandler::new(Arc::new(app)), Some(dispatch_events))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "festival-host exited with error");
            anyhow::anyhow!("festival-host failed: {e}")
        })?;

    tracing::info!("festival-host shut down cleanly");
    Ok(())
}
