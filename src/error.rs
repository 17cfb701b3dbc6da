//! Error types for the chat server
//!
//! Defines application-level errors and outbound send errors.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
///
/// Transport and decode failures are contained to the connection or the
/// single message that caused them. Registration rejections are turned into
/// an `error` message for the requesting connection only.
#[derive(Debug, Error)]
pub enum AppError {
    /// Accepting a new connection failed (logged, accept loop continues)
    #[error("accept error: {0}")]
    Accept(#[source] std::io::Error),

    /// Reading from a connection failed (ends that reader, no departure notice)
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    /// A routed payload was not a valid encoded message
    #[error("invalid message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A routed message had no author
    #[error("message has no author")]
    MissingAuthor,

    /// The username was already used by another connection
    #[error("That username already exists.")]
    DuplicateName(String),

    /// The registry already holds the maximum number of connections
    #[error("Max number of users reached.")]
    AtCapacity(usize),

    /// The username is empty
    #[error("Username can't be empty.")]
    InvalidName,

    /// The welcome banner file is missing or unreadable
    #[error("welcome banner {} is unavailable, don't delete or rename it: {source}", .path.display())]
    BannerUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the log snapshot failed
    #[error("snapshot error: {0}")]
    Snapshot(#[source] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The router input has been closed (server shutting down)
    #[error("Channel closed")]
    ChannelClosed,
}

impl AppError {
    /// Whether this error rejects a registration attempt
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::DuplicateName(_) | AppError::AtCapacity(_) | AppError::InvalidName
        )
    }
}

/// Message send errors
///
/// Occurs when attempting to send to a connection whose writer has gone away.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
