//! Response DTOs

use serde::Serialize;

use crate::websocket::{ConnectionInfo, HubStatsSnapshot};

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// Static asset directory status
    pub static_assets: String,
    /// Live WebSocket connections
    pub connections: Vec<ConnectionInfo>,
    /// Broadcast hub counters
    pub hub: HubStatsSnapshot,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
