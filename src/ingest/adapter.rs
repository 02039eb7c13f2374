//! Inbound Adapter
//!
//! Turns raw payloads into readings, writes each one to the CSV log and then
//! hands it to the broadcast hub. The log append always happens before the
//! enqueue, so a reading is on disk before any client can see it.

use std::sync::Arc;

use crate::reading::decode_payload;
use crate::sink::CsvLog;
use crate::websocket::InboundQueue;

/// What happened to one inbound payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Logged and queued for broadcast
    Forwarded,
    /// Malformed payload, nothing logged or queued
    Discarded,
    /// Logged, but the hub is no longer running
    HubClosed,
}

/// Decodes payloads and feeds the sink and the hub
#[derive(Clone)]
pub struct InboundAdapter {
    sink: Arc<CsvLog>,
    queue: InboundQueue,
}

impl InboundAdapter {
    pub fn new(sink: Arc<CsvLog>, queue: InboundQueue) -> Self {
        Self { sink, queue }
    }

    /// Process one payload from the message source
    pub fn handle_payload(&self, payload: &[u8]) -> IngestOutcome {
        let reading = match decode_payload(payload) {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Discarding malformed sensor payload"
                );
                return IngestOutcome::Discarded;
            }
        };

        // Best effort after startup: a failed row is reported, the reading
        // still reaches the dashboards.
        if let Err(e) = self.sink.append(&reading) {
            tracing::error!(
                error = %e,
                path = %self.sink.path().display(),
                "Failed to append reading to log"
            );
        }

        tracing::info!(
            sensor_id = %reading.id,
            temperature = reading.temperature,
            humidity = reading.humidity,
            timestamp = %reading.timestamp,
            control = reading.control,
            "Reading received"
        );

        match self.queue.push(reading) {
            Ok(()) => IngestOutcome::Forwarded,
            Err(e) => {
                tracing::warn!(error = %e, "Reading logged but not broadcast");
                IngestOutcome::HubClosed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Reading;
    use crate::websocket::{BroadcastHub, Connection, ConnectionRegistry};
    use tempfile::{tempdir, TempDir};
    use tokio::sync::mpsc;

    fn setup() -> (TempDir, InboundAdapter, BroadcastHub) {
        let dir = tempdir().unwrap();
        let sink = Arc::new(CsvLog::open(dir.path().join("sensor_data.csv"), false).unwrap());
        let (queue, hub) = BroadcastHub::new(Arc::new(ConnectionRegistry::new()));
        (dir, InboundAdapter::new(sink, queue), hub)
    }

    fn log_lines(dir: &TempDir) -> Vec<String> {
        std::fs::read_to_string(dir.path().join("sensor_data.csv"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_valid_payload_is_logged_and_forwarded() {
        let (dir, adapter, hub) = setup();
        let payload =
            br#"{"ID":"s1","temperatura":21.5,"umidade":55.0,"timestamp":"t","controle":false}"#;
        assert_eq!(adapter.handle_payload(payload), IngestOutcome::Forwarded);

        assert_eq!(log_lines(&dir), vec!["timestamp,temperatura,umidade", "t,21.50,55.00"]);

        drop(adapter);
        let stats = hub.stats();
        hub.run().await;
        assert_eq!(stats.snapshot().readings, 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_has_no_side_effects() {
        let (dir, adapter, hub) = setup();

        assert_eq!(
            adapter.handle_payload(br#"{"temperatura":"notanumber"}"#),
            IngestOutcome::Discarded
        );
        assert_eq!(adapter.handle_payload(b"garbage"), IngestOutcome::Discarded);

        assert_eq!(log_lines(&dir), vec!["timestamp,temperatura,umidade"]);

        drop(adapter);
        let stats = hub.stats();
        hub.run().await;
        assert_eq!(stats.snapshot().readings, 0);
    }

    #[tokio::test]
    async fn test_log_written_before_reading_is_observable() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("sensor_data.csv");
        let sink = Arc::new(CsvLog::open(&log_path, false).unwrap());
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add(Connection::new(tx)).await;

        let (queue, hub) = BroadcastHub::new(Arc::clone(&registry));
        let hub_task = tokio::spawn(hub.run());
        let adapter = InboundAdapter::new(sink, queue);

        let payload = br#"{"ID":"s9","temperatura":23.456,"umidade":60.1,"timestamp":"2024-01-01T00:00:00Z","controle":true}"#;
        assert_eq!(adapter.handle_payload(payload), IngestOutcome::Forwarded);

        let received = rx.recv().await.unwrap();
        assert_eq!(
            *received,
            Reading::new("s9", 23.456, 60.1, "2024-01-01T00:00:00Z", true)
        );
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.ends_with("2024-01-01T00:00:00Z,23.46,60.10\n"));

        drop(adapter);
        hub_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_hub_gone_still_logs() {
        let (dir, adapter, hub) = setup();
        drop(hub);

        let payload =
            br#"{"ID":"s1","temperatura":1.0,"umidade":2.0,"timestamp":"t","controle":false}"#;
        assert_eq!(adapter.handle_payload(payload), IngestOutcome::HubClosed);
        assert_eq!(log_lines(&dir).len(), 2);
    }
}
