//! Message router
//!
//! The single task that drains the shared input queue. Every payload is
//! decoded, decorated, appended to the log and delivered before the next one
//! is looked at, so the log and every recipient observe the same order.

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::color::decorate;
use crate::error::AppError;
use crate::history::{MessageLog, SnapshotWriter};
use crate::message::{Message, MessageKind, SERVER_AUTHOR};
use crate::registry::Registry;

/// Sending half of the router input
pub type RouterInput = mpsc::Sender<Vec<u8>>;

/// Encode `msg` and queue it for the router
///
/// Waits while the queue is full. Fails once the router has closed its input.
pub async fn submit(input: &RouterInput, msg: &Message) -> Result<(), AppError> {
    let bytes = msg.encode()?;
    input.send(bytes).await.map_err(|_| AppError::ChannelClosed)
}

/// The router
pub struct Router {
    registry: Registry,
    log: MessageLog,
    snapshots: SnapshotWriter,
    /// Encoded messages from every connection
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl Router {
    pub fn new(
        receiver: mpsc::Receiver<Vec<u8>>,
        registry: Registry,
        log: MessageLog,
        snapshots: SnapshotWriter,
    ) -> Self {
        Self {
            registry,
            log,
            snapshots,
            receiver,
        }
    }

    /// Run the router loop
    ///
    /// Processes payloads until every sender is dropped. When `shutdown`
    /// changes (or its sender goes away) the input is closed, anything
    /// already queued is still processed, and the loop ends.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Router started");

        let mut closing = false;
        loop {
            tokio::select! {
                payload = self.receiver.recv() => match payload {
                    Some(payload) => self.handle_payload(payload).await,
                    None => break,
                },
                _ = shutdown.changed(), if !closing => {
                    debug!("Router input closed, draining pending messages");
                    closing = true;
                    self.receiver.close();
                }
            }
        }

        info!("Router shutting down ({} messages logged)", self.log.len());
    }

    /// Process a single payload
    async fn handle_payload(&self, payload: Vec<u8>) {
        let mut msg = match Message::decode(&payload) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Dropping payload of {} bytes: {}", payload.len(), e);
                return;
            }
        };

        msg.text = decorate(&msg.text, msg.kind);
        self.log.append(msg.clone());

        if msg.text.is_empty() {
            debug!("Dropping empty {:?} message from '{}'", msg.kind, msg.author);
            return;
        }

        match msg.kind {
            MessageKind::Error => self.handle_error(msg).await,
            MessageKind::LogRequest => self.handle_log_request(msg).await,
            MessageKind::Notice => {
                info!("{}", msg.text);
                self.handle_broadcast(msg).await;
            }
            MessageKind::Chat => self.handle_broadcast(msg).await,
        }
    }

    /// Errors go back to their author only
    async fn handle_error(&self, msg: Message) {
        warn!("{}", msg.text);

        match self.registry.find(&msg.author) {
            Some(client) => client.deliver(&msg).await,
            None => debug!("No connection for '{}', error not delivered", msg.author),
        }
    }

    /// Snapshot the log, then acknowledge to the requester
    ///
    /// Both happen before the next item is dequeued, so the acknowledgement
    /// reaches the requester in the same position it has in the log. The
    /// permit is released when the write returns.
    async fn handle_log_request(&self, msg: Message) {
        let requester = self.registry.find(&msg.author);
        let entries = self.log.entries();
        let path = self.snapshots.path().display().to_string();

        let permit = self.snapshots.acquire().await;
        match permit.write(&entries).await {
            Ok(()) => {
                info!(
                    "'{}' requested the log, {} entries written to {}",
                    msg.author,
                    entries.len(),
                    path
                );
                if let Some(client) = requester {
                    client.deliver(&msg).await;
                }
            }
            Err(e) => {
                error!("Failed to write log snapshot to {}: {}", path, e);
                if let Some(client) = requester {
                    let text = decorate("Could not write the log file.", MessageKind::Error);
                    client.deliver(&Message::error(SERVER_AUTHOR, text)).await;
                }
            }
        }
    }

    /// Chat and notices go to everyone but the author
    async fn handle_broadcast(&self, msg: Message) {
        let bytes = match msg.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode message from '{}': {}", msg.author, e);
                return;
            }
        };

        let targets = self.registry.broadcast_targets(&msg.author);
        debug!(
            "Broadcasting {:?} from '{}' to {} clients",
            msg.kind,
            msg.author,
            targets.len()
        );

        for client in targets {
            if client.send(bytes.clone()).await.is_err() {
                debug!("Client {} is gone, skipping", client.id);
            }
        }
    }
}
