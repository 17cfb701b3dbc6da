//! Client registry
//!
//! Tracks which connection holds which username, remembers every username
//! that was ever accepted, and enforces the connection limit.
//!
//! `Registry` is a cloneable handle; the reader tasks and the router share
//! one instance. The lock is a plain `std::sync::Mutex` and is never held
//! across an `.await`: callers get cloned [`Client`] handles back and send
//! after the lock is released.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::client::Client;
use crate::error::AppError;
use crate::types::ClientId;

/// A connection bound to a username
#[derive(Debug)]
struct Registration {
    username: String,
    client: Client,
}

#[derive(Debug, Default)]
struct RegistryState {
    clients: HashMap<ClientId, Registration>,
    /// Every username accepted so far
    seen: HashSet<String>,
}

impl RegistryState {
    fn is_active(&self, username: &str) -> bool {
        self.clients.values().any(|r| r.username == username)
    }
}

/// Shared registry handle
#[derive(Debug, Clone)]
pub struct Registry {
    state: Arc<Mutex<RegistryState>>,
    max_clients: usize,
    allow_name_reuse: bool,
}

impl Registry {
    /// Create a registry holding at most `max_clients` connections
    ///
    /// With `allow_name_reuse` unset a username stays taken for the lifetime
    /// of the process, even after its connection leaves.
    pub fn new(max_clients: usize, allow_name_reuse: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            max_clients,
            allow_name_reuse,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // The state stays consistent even if a holder panicked: every
        // mutation is a single insert or remove.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Bind `client` to `username`
    ///
    /// Rejects empty names, names that were already used, and connections
    /// beyond the limit, in that order.
    pub fn register(&self, client: &Client, username: &str) -> Result<(), AppError> {
        if username.is_empty() {
            return Err(AppError::InvalidName);
        }

        let mut state = self.lock();

        if state.seen.contains(username) || state.is_active(username) {
            return Err(AppError::DuplicateName(username.to_string()));
        }

        if state.clients.len() >= self.max_clients {
            return Err(AppError::AtCapacity(self.max_clients));
        }

        state.seen.insert(username.to_string());
        state.clients.insert(
            client.id,
            Registration {
                username: username.to_string(),
                client: client.clone(),
            },
        );

        info!("Client {} registered as '{}'", client.id, username);
        debug!("Active clients: {}/{}", state.clients.len(), self.max_clients);
        Ok(())
    }

    /// Remove the binding for `id` and return its username
    ///
    /// Dropping the registry's handle lets the connection's write task finish
    /// once the reader drops its own. Returns an empty string when nothing
    /// was bound, so a second call is a no-op.
    pub fn unregister(&self, id: ClientId) -> String {
        let mut state = self.lock();

        let Some(registration) = state.clients.remove(&id) else {
            return String::new();
        };

        if self.allow_name_reuse {
            state.seen.remove(&registration.username);
        }

        info!("Client {} ('{}') unregistered", id, registration.username);
        debug!("Active clients: {}/{}", state.clients.len(), self.max_clients);
        registration.username
    }

    /// Every registered connection whose username differs from `excluded`
    ///
    /// Pass an empty string to target everyone.
    pub fn broadcast_targets(&self, excluded: &str) -> Vec<Client> {
        self.lock()
            .clients
            .values()
            .filter(|r| r.username != excluded)
            .map(|r| r.client.clone())
            .collect()
    }

    /// The connection registered as `username`
    pub fn find(&self, username: &str) -> Option<Client> {
        self.lock()
            .clients
            .values()
            .find(|r| r.username == username)
            .map(|r| r.client.clone())
    }

    /// Username bound to `id`
    pub fn username_of(&self, id: ClientId) -> Option<String> {
        self.lock().clients.get(&id).map(|r| r.username.clone())
    }

    pub fn active_count(&self) -> usize {
        self.lock().clients.len()
    }

    /// Whether `username` is currently unavailable for a new registration
    pub fn is_seen(&self, username: &str) -> bool {
        let state = self.lock();
        state.seen.contains(username) || state.is_active(username)
    }
}
