//! Client handle definition
//!
//! A cheap, cloneable handle to a connection's outbound channel. The
//! connection's write task owns the socket; whoever holds a `Client` can
//! queue bytes for it.

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::SendError;
use crate::message::Message;
use crate::types::ClientId;

/// Handle to a connected client
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Server → Client byte channel, drained by the write task
    sender: mpsc::Sender<Vec<u8>>,
}

impl Client {
    /// Create a new client handle with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<Vec<u8>>) -> Self {
        Self { id, sender }
    }

    /// Queue raw bytes for this client
    ///
    /// Waits while the outbound queue is full. Returns an error if the
    /// channel is closed (client disconnected).
    pub async fn send(&self, bytes: Vec<u8>) -> Result<(), SendError> {
        self.sender
            .send(bytes)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Encode and queue a message, logging instead of failing
    pub async fn deliver(&self, msg: &Message) {
        let bytes = match msg.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Failed to encode message for {}: {}", self.id, e);
                return;
            }
        };
        if self.send(bytes).await.is_err() {
            debug!("Client {} is gone, dropping message", self.id);
        }
    }
}
