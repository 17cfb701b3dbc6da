//! Message protocol definitions
//!
//! Every payload after the username is a JSON-encoded [`Message`]. The same
//! shape is appended to the message log and written to snapshots.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Timestamp format used on the wire and in the log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Author used for messages addressed to a connection that has no username yet
pub const SERVER_AUTHOR: &str = "server";

/// Body of the acknowledgement sent back for a log request
pub const LOG_REQUEST_TEXT: &str = "Read the log file";

/// Message kind
///
/// Closed set of kinds, serialized in kebab-case (`log-request`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Chat line written by a user
    Chat,
    /// System notice (join / leave)
    Notice,
    /// Error addressed to a single connection
    Error,
    /// Request to snapshot the log, or its acknowledgement
    LogRequest,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub author: String,
    pub text: String,
    pub timestamp: String,
}

/// Current local time formatted as `YYYY-MM-DD HH:MM:SS`
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(kind: MessageKind, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            author: author.into(),
            text: text.into(),
            timestamp: now_timestamp(),
        }
    }

    pub fn chat(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageKind::Chat, author, text)
    }

    /// Join notice, authored by the user who joined
    pub fn joined(username: &str) -> Self {
        Self::new(
            MessageKind::Notice,
            username,
            format!("{} has joined our chat...", username),
        )
    }

    /// Departure notice, authored by the user who left
    pub fn left(username: &str) -> Self {
        Self::new(
            MessageKind::Notice,
            username,
            format!("{} has left our chat...", username),
        )
    }

    /// Log request on behalf of `username`
    pub fn log_request(username: &str) -> Self {
        Self::new(MessageKind::LogRequest, username, LOG_REQUEST_TEXT)
    }

    pub fn error(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, author, text)
    }

    /// Encode as JSON bytes
    pub fn encode(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode JSON bytes, rejecting messages without an author
    pub fn decode(bytes: &[u8]) -> Result<Self, AppError> {
        let msg: Message = serde_json::from_slice(bytes).map_err(AppError::Decode)?;
        if msg.author.is_empty() {
            return Err(AppError::MissingAuthor);
        }
        Ok(msg)
    }
}

/// Convert a registration rejection into the error message sent back to the
/// connection that caused it
impl From<&AppError> for Message {
    fn from(err: &AppError) -> Self {
        Message::error(SERVER_AUTHOR, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_keeps_fields() {
        let msg = Message {
            kind: MessageKind::Chat,
            author: "alice".to_string(),
            text: "hi".to_string(),
            timestamp: "2024-01-02 03:04:05".to_string(),
        };
        let bytes = msg.encode().unwrap();
        assert_eq!(Message::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_kind_serialize() {
        let msg = Message::log_request("bob");
        let json = String::from_utf8(msg.encode().unwrap()).unwrap();
        assert!(json.contains("\"kind\":\"log-request\""));
        assert!(json.contains("\"author\":\"bob\""));
    }

    #[test]
    fn test_decode_client_json() {
        let json = r#"{"kind": "chat", "author": "alice", "text": "hello", "timestamp": "2024-05-06 07:08:09"}"#;
        let msg = Message::decode(json.as_bytes()).unwrap();
        assert_eq!(msg.kind, MessageKind::Chat);
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.timestamp, "2024-05-06 07:08:09");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Message::decode(b"hello there"),
            Err(AppError::Decode(_))
        ));
        let json = r#"{"kind": "whisper", "author": "a", "text": "", "timestamp": ""}"#;
        assert!(matches!(Message::decode(json.as_bytes()), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_missing_author() {
        let json = r#"{"kind": "chat", "author": "", "text": "hi", "timestamp": "2024-05-06 07:08:09"}"#;
        assert!(matches!(
            Message::decode(json.as_bytes()),
            Err(AppError::MissingAuthor)
        ));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_notices() {
        let msg = Message::joined("bob");
        assert_eq!(msg.kind, MessageKind::Notice);
        assert_eq!(msg.author, "bob");
        assert_eq!(msg.text, "bob has joined our chat...");
        assert_eq!(Message::left("alice").text, "alice has left our chat...");
    }

    #[test]
    fn test_rejection_message() {
        let msg = Message::from(&AppError::DuplicateName("alice".to_string()));
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.author, SERVER_AUTHOR);
        assert_eq!(msg.text, "That username already exists.");
    }
}
