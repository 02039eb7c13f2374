//! Sensor Ingest
//!
//! Everything between the MQTT broker and the broadcast hub:
//!
//! - [`MqttSource`]: subscription and reconnect loop
//! - [`InboundAdapter`]: decode, log to CSV, enqueue for broadcast

mod adapter;
mod mqtt;

pub use adapter::{InboundAdapter, IngestOutcome};
pub use mqtt::MqttSource;
