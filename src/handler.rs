//! Connection handler
//!
//! Handles individual client connections: welcome banner, username
//! registration, forwarding payloads to the router, and the
//! disconnection notice.
//!
//! A connection is read in chunks of at most [`READ_BUFFER_SIZE`] bytes and
//! every chunk is one payload. The first accepted payload is the username;
//! everything after that is an encoded message handed to the router as is.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::banner::WelcomeBanner;
use crate::client::Client;
use crate::color::decorate;
use crate::error::AppError;
use crate::history::MessageLog;
use crate::message::Message;
use crate::registry::Registry;
use crate::router::{submit, RouterInput};
use crate::types::ClientId;

/// Largest payload read in one go
pub const READ_BUFFER_SIZE: usize = 4096;

/// Shared handles every connection needs
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub registry: Registry,
    pub log: MessageLog,
    pub router: RouterInput,
    pub banner: WelcomeBanner,
    /// Size of each connection's outbound queue
    pub outbound_capacity: usize,
}

/// Reader state
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReaderState {
    AwaitingUsername,
    Active { username: String },
}

/// Handle a new connection
///
/// Sends the banner, runs the reader until the peer goes away, and makes
/// sure the registry no longer refers to this connection afterwards.
pub async fn handle_connection<S>(stream: S, ctx: ConnectionContext) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let client_id = ClientId::new();
    let (reader, writer) = tokio::io::split(stream);

    // Channel for server -> client bytes
    let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(ctx.outbound_capacity.max(1));
    let client = Client::new(client_id, out_tx);

    let write_task = tokio::spawn(write_loop(writer, out_rx, client_id));
    tokio::spawn(send_banner(ctx.banner.clone(), client.clone()));

    let result = read_loop(reader, &client, &ctx).await;

    // Reader is done: drop the last handles so the write task can finish
    ctx.registry.unregister(client_id);
    drop(client);
    let _ = write_task.await;

    debug!("Connection {} closed", client_id);
    result
}

/// Queue the welcome banner for a new connection
async fn send_banner(banner: WelcomeBanner, client: Client) {
    match banner.read().await {
        Ok(bytes) => {
            if client.send(bytes).await.is_err() {
                debug!("Client {} left before the banner was sent", client.id);
            }
        }
        Err(e) => {
            error!("Configuration error: {}", e);
        }
    }
}

/// Drain the outbound queue into the socket
async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<Vec<u8>>, client_id: ClientId)
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            debug!("Write to {} failed: {}", client_id, e);
            break;
        }
    }

    let _ = writer.shutdown().await;
    debug!("Write task ended for {}", client_id);
}

async fn read_loop<R>(mut reader: R, client: &Client, ctx: &ConnectionContext) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut state = ReaderState::AwaitingUsername;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                handle_end_of_stream(client, ctx).await;
                return Ok(());
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Read error on {}: {}", client.id, e);
                return Err(AppError::Read(e));
            }
        };
        let payload = &buf[..n];

        if let ReaderState::Active { username } = &state {
            debug!("'{}' sent {} bytes", username, n);
            ctx.router
                .send(payload.to_vec())
                .await
                .map_err(|_| AppError::ChannelClosed)?;
            continue;
        }

        if let Some(username) = try_register(payload, client, ctx).await? {
            state = ReaderState::Active { username };
        }
    }
}

/// Username carried by the first payload, without its line terminator
fn parse_username(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Register the connection under the name in `payload`
///
/// Returns the username once accepted. A rejection is reported to this
/// connection only and leaves it unregistered, so the next payload is taken
/// as another attempt.
async fn try_register(
    payload: &[u8],
    client: &Client,
    ctx: &ConnectionContext,
) -> Result<Option<String>, AppError> {
    let username = parse_username(payload);
    let log_was_empty = ctx.log.is_empty();

    match ctx.registry.register(client, &username) {
        Ok(()) => {
            submit(&ctx.router, &Message::joined(&username)).await?;
            if !log_was_empty {
                submit(&ctx.router, &Message::log_request(&username)).await?;
            }
            Ok(Some(username))
        }
        Err(e) if e.is_rejection() => {
            warn!("Client {} rejected as '{}': {}", client.id, username, e);
            let mut msg = Message::from(&e);
            msg.text = decorate(&msg.text, msg.kind);
            client.deliver(&msg).await;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Announce the departure of a registered user, then drop the binding
async fn handle_end_of_stream(client: &Client, ctx: &ConnectionContext) {
    let Some(username) = ctx.registry.username_of(client.id) else {
        debug!("Client {} left before registering", client.id);
        return;
    };

    info!("'{}' disconnected", username);
    if let Err(e) = submit(&ctx.router, &Message::left(&username)).await {
        debug!("Departure of '{}' not announced: {}", username, e);
    }
    ctx.registry.unregister(client.id);
}
