//! Multi-client TCP Chat Server Library
//!
//! A broadcast chat server over plain TCP: clients connect, send a username,
//! then exchange JSON-encoded messages that are relayed to every other
//! connected client.
//!
//! # Features
//! - Welcome banner on connect
//! - Username registration with uniqueness and a connection limit
//! - Join / leave notices
//! - Ordered broadcast of chat messages
//! - In-memory message log, written to disk on request
//!
//! # Architecture
//! - `ChatServer` accepts connections and owns the shared state
//! - Each connection has a `handler` task that reads payloads and a write
//!   task that drains its outbound queue
//! - A single `Router` task drains one bounded `mpsc` queue, so the log and
//!   every recipient see messages in the same order
//!
//! # Example
//! ```ignore
//! use tcp_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind(ServerConfig::default()).await.unwrap();
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//! }
//! ```

pub mod banner;
pub mod client;
pub mod color;
pub mod config;
pub mod error;
pub mod handler;
pub mod history;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use banner::WelcomeBanner;
pub use client::Client;
pub use color::decorate;
pub use config::ServerConfig;
pub use error::{AppError, SendError};
pub use handler::{handle_connection, ConnectionContext};
pub use history::{load_snapshot, render_as_text, MessageLog, SnapshotWriter};
pub use message::{Message, MessageKind};
pub use registry::Registry;
pub use router::{Router, RouterInput};
pub use server::ChatServer;
pub use types::ClientId;
