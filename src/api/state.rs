//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::websocket::{ConnectionRegistry, HubStats};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Live WebSocket connections, shared with the broadcast hub
    pub registry: Arc<ConnectionRegistry>,
    /// Counters published by the broadcast hub
    pub hub_stats: Arc<HubStats>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        hub_stats: Arc<HubStats>,
        config: ServerConfig,
    ) -> Self {
        Self {
            registry,
            hub_stats,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
