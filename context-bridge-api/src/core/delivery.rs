//! Push payloads to live connections

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Connection closed: {0}")]
    Closed(String),
}

/// Transport-side "push to connection" primitive
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn push(&self, connection_id: &str, payload: String) -> Result<(), DeliveryError>;
}

/// Outbound channels of the sockets currently open on this process
#[derive(Default)]
pub struct ConnectionRegistry {
    senders: DashMap<String, mpsc::UnboundedSender<String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the receiving end its writer drains
    pub fn register(&self, connection_id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(connection_id.to_string(), tx);
        debug!("Registered connection {} ({} open)", connection_id, self.len());
        rx
    }

    pub fn unregister(&self, connection_id: &str) {
        if self.senders.remove(connection_id).is_some() {
            debug!("Unregistered connection {} ({} open)", connection_id, self.len());
        }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[async_trait]
impl Delivery for ConnectionRegistry {
    async fn push(&self, connection_id: &str, payload: String) -> Result<(), DeliveryError> {
        let sender = self
            .senders
            .get(connection_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DeliveryError::UnknownConnection(connection_id.to_string()))?;

        sender
            .send(payload)
            .map_err(|_| DeliveryError::Closed(connection_id.to_string()))
    }
}
