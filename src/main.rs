//! TCP Chat Server - Entry Point
//!
//! Loads the configuration, binds the listener and runs the server until
//! Ctrl-C.

use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tcp_chat::{ChatServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tcp_chat=info")),
        )
        .init();

    let mut config = ServerConfig::load()?;

    // Port or address from command line overrides the config
    let mut args = env::args().skip(1);
    match (args.next(), args.next()) {
        (Some(arg), None) => config.set_listen_arg(&arg),
        (None, None) => {}
        _ => {
            error!("[USAGE]: tcp_chat [port | host:port]");
            return Err("too many arguments".into());
        }
    }

    let server = ChatServer::bind(config).await?;
    info!("TCP Chat Server listening on {}", server.local_addr()?);

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
