//! Connection Registry
//!
//! Tracks the WebSocket connections that are eligible for broadcast delivery.
//! A single `RwLock` guards the membership map: iteration takes the read
//! side, `add`/`remove` take the write side, and no I/O happens while the
//! write lock is held.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::reading::Reading;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Send-side handle for one client session
///
/// The transport itself is owned by the acceptor task. The registry only
/// holds this handle, which feeds the task's outbound channel.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Arc<Reading>>,
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Create a connection handle with a fresh ID
    pub fn new(sender: mpsc::UnboundedSender<Arc<Reading>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Push a reading to the peer
    ///
    /// Fails once the peer's writer task has exited, which happens on the
    /// first transport error or when the client goes away.
    pub fn send(&self, reading: &Arc<Reading>) -> Result<(), SendError> {
        self.sender
            .send(Arc::clone(reading))
            .map_err(|_| SendError::PeerGone)
    }
}

/// Errors from pushing a reading to a connection
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Peer is gone")]
    PeerGone,
}

/// Verdict returned by the visitor passed to [`ConnectionRegistry::for_each_live`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Keep,
    Evict,
}

/// Public view of a registered connection
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub connected_at: DateTime<Utc>,
}

/// Live-membership set of WebSocket connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection as a delivery target
    ///
    /// Returns false if a connection with the same ID was already present, in
    /// which case the existing member is kept.
    pub async fn add(&self, conn: Connection) -> bool {
        let id = conn.id.clone();
        let inserted = match self.connections.write().await.entry(conn.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(conn);
                true
            }
        };

        if inserted {
            tracing::info!(connection_id = %id, "WebSocket connected");
        } else {
            tracing::warn!(connection_id = %id, "Connection already registered");
        }
        inserted
    }

    /// Remove a connection. Removing an absent ID is a no-op.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.connections.write().await.remove(id).is_some();
        if removed {
            tracing::info!(connection_id = %id, "WebSocket disconnected");
        }
        removed
    }

    /// Visit every live connection under the read lock
    ///
    /// Concurrent visits may run side by side; `add` and `remove` wait until
    /// they finish. Connections the visitor marks [`Delivery::Evict`] are
    /// removed after the read lock is released, under a separate write lock.
    /// Returns the IDs that were evicted.
    pub async fn for_each_live<F>(&self, mut visit: F) -> Vec<ConnectionId>
    where
        F: FnMut(&Connection) -> Delivery,
    {
        let mut marked = Vec::new();
        {
            let connections = self.connections.read().await;
            for conn in connections.values() {
                if visit(conn) == Delivery::Evict {
                    marked.push(conn.id.clone());
                }
            }
        }

        if marked.is_empty() {
            return marked;
        }

        let mut connections = self.connections.write().await;
        marked
            .into_iter()
            .filter(|id| connections.remove(id).is_some())
            .collect()
    }

    /// Number of live connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.connections.read().await.contains_key(id)
    }

    /// Point-in-time listing of the live connections
    pub async fn snapshot(&self) -> Vec<ConnectionInfo> {
        let mut infos: Vec<ConnectionInfo> = self
            .connections
            .read()
            .await
            .values()
            .map(|conn| ConnectionInfo {
                id: conn.id.clone(),
                connected_at: conn.connected_at,
            })
            .collect();
        infos.sort_by_key(|info| info.connected_at);
        infos
    }
}
