//! WebSocket Real-Time Streaming
//!
//! Pushes sensor readings to dashboard clients as they arrive.
//!
//! ## Architecture
//!
//! - **ConnectionRegistry**: live-membership set of client connections
//! - **BroadcastHub**: single loop fanning each reading out to the registry
//! - **Handler**: WebSocket upgrade and per-connection lifecycle
//!
//! ## Usage
//!
//! Clients connect to `/ws` and receive one JSON message per reading:
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onmessage = (event) => {
//!   const reading = JSON.parse(event.data);
//!   console.log(reading.ID, reading.temperatura, reading.umidade);
//! };
//! ```

mod handler;
mod hub;
mod registry;

pub use handler::websocket_handler;
pub use hub::{BroadcastHub, HubStats, HubStatsSnapshot, InboundQueue, QueueClosed};
pub use registry::{
    Connection, ConnectionId, ConnectionInfo, ConnectionRegistry, Delivery, SendError,
};
