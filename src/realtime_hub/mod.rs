//! RealtimeHub - WebSocket Notification Fan-out
//!
//! ## Responsibilities
//!
//! - WebSocket connection registry
//! - `connected` acknowledgment to each new client
//! - Upload notifications broadcast to every client
//!
//! Note: Only NOTIFICATIONS (filename + id) are pushed. File content is
//! fetched via HTTP GET /message/{id}.
//!
//! Every client owns a bounded outbound queue drained by its own writer task.
//! The hub only ever `try_send`s into it, so a slow or dead client can not
//! stall delivery to the others: a full or closed queue counts as a failed
//! send and the client is dropped from the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::artifact_store::ArtifactId;

/// Default number of undelivered events a client may lag behind
pub const DEFAULT_CLIENT_BUFFER: usize = 64;

/// Connection handle
pub type ConnectionId = Uuid;

/// Hub message types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    /// Sent once to a freshly registered client
    Connected,
    /// A new file was stored
    NewMessage { filename: String, id: ArtifactId },
}

impl HubMessage {
    fn kind(&self) -> &'static str {
        match self {
            HubMessage::Connected => "connected",
            HubMessage::NewMessage { .. } => "new_message",
        }
    }
}

/// Client connection
struct ClientConnection {
    tx: mpsc::Sender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<ConnectionId, ClientConnection>>,
    client_buffer: usize,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self::with_client_buffer(DEFAULT_CLIENT_BUFFER)
    }

    /// Create with a custom per-client queue size
    pub fn with_client_buffer(client_buffer: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            // the connected ack needs at least one slot
            client_buffer: client_buffer.max(1),
        }
    }

    /// Register a new client
    ///
    /// The returned receiver already holds the `connected` acknowledgment.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.client_buffer);

        match serde_json::to_string(&HubMessage::Connected) {
            Ok(ack) => {
                // Queued before the client is visible to broadcasts
                let _ = tx.try_send(ack);
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize connected message"),
        }

        let total = {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { tx });
            connections.len()
        };

        tracing::info!(connection_id = %id, total_clients = total, "Client connected");

        (id, rx)
    }

    /// Unregister a client (no-op when unknown)
    pub async fn unregister(&self, id: &ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            tracing::info!(
                connection_id = %id,
                total_clients = connections.len(),
                "Client disconnected"
            );
        }
    }

    /// Broadcast message to all clients
    ///
    /// Returns the number of clients the message was handed to. Clients whose
    /// queue is full or closed are unregistered after the pass.
    pub async fn broadcast(&self, message: HubMessage) -> usize {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let connections = self.connections.read().await;
            if connections.is_empty() {
                return 0;
            }

            for (id, conn) in connections.iter() {
                match conn.tx.try_send(json.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(connection_id = %id, "Client queue full, dropping client");
                        failed.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::warn!(connection_id = %id, "Client channel closed, dropping client");
                        failed.push(*id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &failed {
                connections.remove(id);
            }
        }

        tracing::info!(
            message_type = %message.kind(),
            delivered = delivered,
            dropped = failed.len(),
            "Broadcast message to clients"
        );

        delivered
    }

    /// Get connection count
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether a connection is still registered
    #[cfg(test)]
    pub async fn is_registered(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
