//! Broadcast Hub
//!
//! A single loop drains the inbound queue and fans each reading out to every
//! live connection in the registry. Deliveries never overlap, so every
//! connection sees readings in the order they were enqueued. Connections
//! whose send fails are evicted and the round carries on with the rest.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use super::registry::{ConnectionId, ConnectionRegistry, Delivery};
use crate::reading::Reading;

/// Producer side of the hub's inbound queue
///
/// The queue is unbounded: a slow hub grows memory rather than stalling the
/// message source.
#[derive(Debug, Clone)]
pub struct InboundQueue {
    tx: mpsc::UnboundedSender<Reading>,
}

impl InboundQueue {
    /// Enqueue a reading for broadcast
    pub fn push(&self, reading: Reading) -> Result<(), QueueClosed> {
        self.tx.send(reading).map_err(|_| QueueClosed)
    }
}

/// The hub has stopped and no longer accepts readings
#[derive(Debug, Error)]
#[error("Broadcast hub is not running")]
pub struct QueueClosed;

/// Counters maintained by the hub
#[derive(Debug, Default)]
pub struct HubStats {
    readings: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
}

/// Copy of [`HubStats`] at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStatsSnapshot {
    /// Readings pulled from the queue and broadcast
    pub readings: u64,
    /// Successful per-connection sends
    pub deliveries: u64,
    /// Connections evicted after a failed send
    pub evictions: u64,
}

impl HubStats {
    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            readings: self.readings.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of broadcasting a single reading
#[derive(Debug, Clone, Default)]
pub(crate) struct DeliveryReport {
    pub(crate) delivered: usize,
    pub(crate) evicted: Vec<ConnectionId>,
}

/// Single-consumer fan-out stage
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    inbound: mpsc::UnboundedReceiver<Reading>,
    stats: Arc<HubStats>,
}

impl BroadcastHub {
    /// Create a hub over `registry` along with the queue that feeds it
    pub fn new(registry: Arc<ConnectionRegistry>) -> (InboundQueue, Self) {
        let (tx, inbound) = mpsc::unbounded_channel();
        let hub = Self {
            registry,
            inbound,
            stats: Arc::new(HubStats::default()),
        };
        (InboundQueue { tx }, hub)
    }

    /// Shared handle to the hub counters
    pub fn stats(&self) -> Arc<HubStats> {
        Arc::clone(&self.stats)
    }

    /// Run the broadcast loop
    ///
    /// Returns once every [`InboundQueue`] has been dropped and the readings
    /// still queued have been delivered.
    pub async fn run(mut self) {
        tracing::info!("Broadcast hub started");

        while let Some(reading) = self.inbound.recv().await {
            self.deliver(reading).await;
        }

        tracing::info!("Broadcast hub stopped, inbound queue closed");
    }

    async fn deliver(&self, reading: Reading) -> DeliveryReport {
        let reading = Arc::new(reading);
        let mut delivered = 0usize;

        let evicted = self
            .registry
            .for_each_live(|conn| match conn.send(&reading) {
                Ok(()) => {
                    delivered += 1;
                    Delivery::Keep
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn.id(),
                        error = %e,
                        "Send failed, evicting connection"
                    );
                    Delivery::Evict
                }
            })
            .await;

        for id in &evicted {
            tracing::info!(connection_id = %id, "Evicted WebSocket connection");
        }

        self.stats.readings.fetch_add(1, Ordering::Relaxed);
        self.stats
            .deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.stats
            .evictions
            .fetch_add(evicted.len() as u64, Ordering::Relaxed);

        tracing::trace!(
            sensor_id = %reading.id,
            recipients = delivered,
            "Broadcast reading"
        );

        DeliveryReport { delivered, evicted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::registry::Connection;

    fn reading(n: usize) -> Reading {
        Reading::new("s1", n as f64, 50.0, format!("t{}", n), n % 2 == 0)
    }

    async fn register(
        registry: &ConnectionRegistry,
    ) -> (String, mpsc::UnboundedReceiver<Arc<Reading>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new(tx);
        let id = conn.id().to_string();
        registry.add(conn).await;
        (id, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Arc<Reading>>) -> Vec<Reading> {
        let mut out = Vec::new();
        while let Ok(reading) = rx.try_recv() {
            out.push((*reading).clone());
        }
        out
    }

    #[tokio::test]
    async fn test_every_connection_receives_all_in_order() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut receivers = Vec::new();
        for _ in 0..3 {
            receivers.push(register(&registry).await.1);
        }

        let (queue, hub) = BroadcastHub::new(Arc::clone(&registry));
        let stats = hub.stats();
        let expected: Vec<Reading> = (0..20).map(reading).collect();
        for r in &expected {
            queue.push(r.clone()).unwrap();
        }
        drop(queue);
        hub.run().await;

        for rx in &mut receivers {
            assert_eq!(drain(rx), expected);
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.readings, 20);
        assert_eq!(snapshot.deliveries, 60);
        assert_eq!(snapshot.evictions, 0);
    }

    #[tokio::test]
    async fn test_failed_peer_is_evicted_and_others_continue() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_healthy_id, mut healthy_rx) = register(&registry).await;
        let (failing_id, mut failing_rx) = register(&registry).await;

        let (_queue, hub) = BroadcastHub::new(Arc::clone(&registry));

        for n in 0..3 {
            let report = hub.deliver(reading(n)).await;
            assert_eq!(report.delivered, 2);
        }

        // Peer goes away while reading 3 is being delivered
        assert_eq!(drain(&mut failing_rx).len(), 3);
        drop(failing_rx);

        let report = hub.deliver(reading(3)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.evicted, vec![failing_id.clone()]);
        assert!(!registry.contains(&failing_id).await);

        for n in 4..6 {
            let report = hub.deliver(reading(n)).await;
            assert_eq!(report.delivered, 1);
            assert!(report.evicted.is_empty());
        }

        let expected: Vec<Reading> = (0..6).map(reading).collect();
        assert_eq!(drain(&mut healthy_rx), expected);
        assert_eq!(hub.stats().snapshot().evictions, 1);
    }

    #[tokio::test]
    async fn test_late_connection_gets_no_earlier_readings() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_queue, hub) = BroadcastHub::new(Arc::clone(&registry));

        let report = hub.deliver(reading(0)).await;
        assert_eq!(report.delivered, 0);

        let (_id, mut rx) = register(&registry).await;
        assert!(drain(&mut rx).is_empty());

        hub.deliver(reading(1)).await;
        assert_eq!(drain(&mut rx), vec![reading(1)]);
    }

    #[tokio::test]
    async fn test_removed_connection_stops_receiving() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (id, mut rx) = register(&registry).await;
        let (_queue, hub) = BroadcastHub::new(Arc::clone(&registry));

        hub.deliver(reading(0)).await;
        registry.remove(&id).await;
        hub.deliver(reading(1)).await;

        assert_eq!(drain(&mut rx), vec![reading(0)]);
    }

    #[tokio::test]
    async fn test_push_after_hub_dropped_fails() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (queue, hub) = BroadcastHub::new(registry);
        drop(hub);

        assert!(queue.push(reading(0)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_with_concurrent_churn() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_stable_id, mut stable_rx) = register(&registry).await;
        let (queue, hub) = BroadcastHub::new(Arc::clone(&registry));
        let hub_task = tokio::spawn(hub.run());

        let churn = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for _ in 0..100 {
                    let (tx, rx) = mpsc::unbounded_channel();
                    let conn = Connection::new(tx);
                    let id = conn.id().to_string();
                    registry.add(conn).await;
                    drop(rx);
                    tokio::task::yield_now().await;
                    registry.remove(&id).await;
                }
            })
        };

        let expected: Vec<Reading> = (0..200).map(reading).collect();
        for r in &expected {
            queue.push(r.clone()).unwrap();
        }
        churn.await.unwrap();
        drop(queue);
        hub_task.await.unwrap();

        assert_eq!(drain(&mut stable_rx), expected);
        assert_eq!(registry.len().await, 1);
    }
}
