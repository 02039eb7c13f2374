//! Sensor Bridge
//!
//! Run with: cargo run -- --config config.toml
//!
//! Without `--config` the default locations are searched, then defaults with
//! `SENSOR_BRIDGE_*` environment overrides are used. `RUST_LOG` takes
//! precedence over the configured log level.

use anyhow::Context;
use clap::Parser;
use sensor_bridge::{
    generate_default_config, serve, AppState, BroadcastHub, Config, ConnectionRegistry, CsvLog,
    InboundAdapter, LoggingConfig, MqttSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sensor-bridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Relay MQTT sensor readings to WebSocket dashboards and a CSV log")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of dashboard assets (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// CSV log file (overrides config)
    #[arg(long)]
    log_path: Option<PathBuf>,

    /// Print a default config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let (mut config, source) = match &cli.config {
        Some(path) => (Config::load_with_env(path)?, Some(path.clone())),
        None => Config::load_default()?,
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.static_dir {
        config.server.static_dir = dir;
    }
    if let Some(path) = cli.log_path {
        config.log.path = path;
    }

    init_tracing(&config.logging);

    tracing::info!("Starting sensor bridge v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }

    // Without a log file the bridge cannot keep its durability promise
    let sink = CsvLog::open(&config.log.path, config.log.fsync)
        .with_context(|| format!("Failed to open reading log {:?}", config.log.path))?;
    tracing::info!("Readings saved to {:?}", sink.path());

    let registry = Arc::new(ConnectionRegistry::new());
    let (queue, hub) = BroadcastHub::new(Arc::clone(&registry));
    let state = AppState::new(Arc::clone(&registry), hub.stats(), config.server.clone());
    let hub_task = tokio::spawn(hub.run());

    let adapter = InboundAdapter::new(Arc::new(sink), queue);
    let source = MqttSource::new(&config.mqtt);
    tracing::info!(
        "Listening on topic {} at {}:{}",
        source.topic(),
        config.mqtt.host,
        config.mqtt.port
    );
    let source_task = tokio::spawn(source.run(adapter));

    tracing::info!("Dashboard: http://{}", config.server.addr());
    serve(state).await?;

    // Dropping the source releases the last queue handle; the hub drains and exits
    source_task.abort();
    let _ = source_task.await;
    hub_task.await.context("Broadcast hub task failed")?;

    tracing::info!("Sensor bridge stopped");
    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sensor_bridge={},tower_http=info",
            config.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
