//! Message log
//!
//! Ordered, append-only history of every message the router processed,
//! plus the on-demand snapshot to disk and the plain-text rendition.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::color::{blue, RESET};
use crate::error::AppError;
use crate::message::{Message, MessageKind};

/// Shared message log handle
///
/// Only the router appends; readers may check whether it is empty.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Arc<Mutex<Vec<Message>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, msg: Message) {
        self.lock().push(msg);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the log as it is right now
    pub fn entries(&self) -> Vec<Message> {
        self.lock().clone()
    }
}

/// Render the log the way clients display it
///
/// Chat entries get a `[timestamp][author]:` prefix, notices and errors end
/// with a line break, log requests are left out.
pub fn render_as_text(logs: &[Message]) -> String {
    let mut text = String::new();
    for msg in logs {
        match msg.kind {
            MessageKind::Chat => {
                text.push_str(&format!(
                    "{}[{}][{}]:{}",
                    blue(),
                    msg.timestamp,
                    msg.author,
                    RESET
                ));
                text.push_str(&msg.text);
            }
            MessageKind::Notice | MessageKind::Error => {
                text.push_str(&msg.text);
                text.push('\n');
            }
            MessageKind::LogRequest => {}
        }
    }
    text
}

/// Writes log snapshots to a single file
///
/// Writers take a [`SnapshotPermit`] first. Permits are granted in the order
/// they were requested, so snapshots land on disk in router order.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    lock: Arc<AsyncMutex<()>>,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for exclusive access to the snapshot file
    pub async fn acquire(&self) -> SnapshotPermit {
        SnapshotPermit {
            path: self.path.clone(),
            _guard: self.lock.clone().lock_owned().await,
        }
    }
}

/// Exclusive right to write the snapshot file, released on drop
#[derive(Debug)]
pub struct SnapshotPermit {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl SnapshotPermit {
    /// Overwrite the snapshot file with `entries` as a JSON array
    pub async fn write(self, entries: &[Message]) -> Result<(), AppError> {
        let json = serde_json::to_vec(entries)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(AppError::Snapshot)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o660);
            tokio::fs::set_permissions(&self.path, perms)
                .await
                .map_err(AppError::Snapshot)?;
        }

        debug!(
            "Wrote {} log entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Read a snapshot file back
pub async fn load_snapshot(path: &Path) -> Result<Vec<Message>, AppError> {
    let bytes = tokio::fs::read(path).await.map_err(AppError::Snapshot)?;
    Ok(serde_json::from_slice(&bytes)?)
}
