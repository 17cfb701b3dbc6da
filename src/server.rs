//! ChatServer: the connection acceptor
//!
//! Owns the listening socket, the shared registry and message log, and the
//! router task. Each accepted connection gets its own handler task.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::banner::WelcomeBanner;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::{handle_connection, ConnectionContext};
use crate::history::{MessageLog, SnapshotWriter};
use crate::registry::Registry;
use crate::router::Router;

/// The chat server
pub struct ChatServer {
    listener: TcpListener,
    config: ServerConfig,
    registry: Registry,
    log: MessageLog,
}

impl ChatServer {
    /// Bind the listening socket
    pub async fn bind(config: ServerConfig) -> Result<Self, AppError> {
        config.validate()?;
        let listener = TcpListener::bind(&config.listen_addr).await?;
        let registry = Registry::new(config.max_clients, config.allow_name_reuse_after_departure);

        Ok(Self {
            listener,
            config,
            registry,
            log: MessageLog::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the client registry
    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Handle to the message log
    pub fn message_log(&self) -> MessageLog {
        self.log.clone()
    }

    /// Accept connections until `shutdown` completes
    ///
    /// On shutdown the listener is dropped and the router input is closed;
    /// returns once the router has processed everything still queued.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let (input_tx, input_rx) = mpsc::channel(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let router = Router::new(
            input_rx,
            self.registry.clone(),
            self.log.clone(),
            SnapshotWriter::new(&self.config.snapshot_path),
        );
        let router_task = tokio::spawn(router.run(shutdown_rx));

        let ctx = ConnectionContext {
            registry: self.registry.clone(),
            log: self.log.clone(),
            router: input_tx,
            banner: WelcomeBanner::new(&self.config.welcome_banner),
            outbound_capacity: self.config.outbound_capacity,
        };

        info!(
            "Accepting connections (max {} clients)",
            self.config.max_clients
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stop signal received");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let ctx = ctx.clone();

                        // Spawn handler task for each connection
                        tokio::spawn(async move {
                            match handle_connection(stream, ctx).await {
                                Ok(()) => debug!("Connection from {} finished", addr),
                                Err(e) => warn!("Connection from {} ended: {}", addr, e),
                            }
                        });
                    }
                    Err(e) => {
                        error!("{}", AppError::Accept(e));
                    }
                }
            }
        }

        drop(self.listener);
        drop(ctx);
        let _ = shutdown_tx.send(true);

        if let Err(e) = router_task.await {
            error!("Router task failed: {}", e);
        }
        info!("Server stopped");
    }
}
