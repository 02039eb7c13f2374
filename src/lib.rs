//! # Sensor Bridge
//!
//! Relays sensor readings published over MQTT to live browser dashboards via
//! WebSocket, and appends every accepted reading to a CSV log.
//!
//! ## Data flow
//!
//! ```text
//! MqttSource -> InboundAdapter -> CsvLog (append, flushed)
//!                              -> InboundQueue -> BroadcastHub -> ConnectionRegistry -> clients
//! ```
//!
//! ## Modules
//!
//! - [`reading`]: the `Reading` value type and payload decoding
//! - [`websocket`]: connection registry, broadcast hub, `/ws` handler
//! - [`ingest`]: MQTT subscription and the inbound adapter
//! - [`sink`]: append-only CSV log
//! - [`api`]: HTTP router, health checks, static assets
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sensor_bridge::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!
//!     let sink = Arc::new(CsvLog::open(&config.log.path, config.log.fsync)?);
//!     let registry = Arc::new(ConnectionRegistry::new());
//!     let (queue, hub) = BroadcastHub::new(Arc::clone(&registry));
//!     let state = AppState::new(Arc::clone(&registry), hub.stats(), config.server.clone());
//!
//!     tokio::spawn(hub.run());
//!     let adapter = InboundAdapter::new(sink, queue);
//!     tokio::spawn(MqttSource::new(&config.mqtt).run(adapter));
//!
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod ingest;
pub mod reading;
pub mod sink;
pub mod util;
pub mod websocket;

pub use reading::{decode_payload, DecodeError, Reading};

pub use websocket::{
    websocket_handler, BroadcastHub, Connection, ConnectionId, ConnectionInfo,
    ConnectionRegistry, Delivery, HubStats, HubStatsSnapshot, InboundQueue,
    QueueClosed, SendError,
};

pub use ingest::{InboundAdapter, IngestOutcome, MqttSource};

pub use sink::{CsvLog, SinkError, SinkResult};

pub use api::{build_router, serve, ApiError, ApiResult, AppState};

pub use config::{
    generate_default_config, Config, ConfigError, LogSinkConfig, LoggingConfig, MqttConfig,
    ServerConfig,
};
