//! Named channels for many-to-one contribution delivery
//!
//! A named channel is addressable by a shared identifier: the registry
//! maps each name to the sending side of a bounded mpsc channel, while the
//! receiving side is handed to exactly one reader at creation time. Writers
//! open a sender on demand knowing only the name. End-of-input is observed
//! once the registry entry is removed and every opened sender has been
//! dropped.

use crate::catalog::ProductId;
use crate::error::{Result, TallyError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifier of the contribution channel for one product.
pub fn contribution_channel_name(id: ProductId) -> String {
    format!("product.{id}.contributions")
}

/// Registry of named channels, shared by handle between the orchestrator
/// and the workers it spawns.
#[derive(Debug)]
pub struct NamedChannelRegistry<T> {
    channels: Arc<Mutex<HashMap<String, mpsc::Sender<T>>>>,
}

impl<T> Clone for NamedChannelRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl<T: Send + 'static> Default for NamedChannelRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> NamedChannelRegistry<T> {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a channel under `name` and return its single receiving end.
    /// Creating a name that already exists is an error.
    pub fn create(&self, name: &str, capacity: usize) -> Result<mpsc::Receiver<T>> {
        let mut channels = self.lock();
        if channels.contains_key(name) {
            return Err(TallyError::ChannelCreation {
                name: name.to_string(),
                reason: "a channel with this name already exists".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(capacity);
        channels.insert(name.to_string(), tx);
        debug!(channel = name, capacity, "created named channel");
        Ok(rx)
    }

    /// Open the writing end of an existing named channel.
    pub fn open_writer(&self, name: &str) -> Result<mpsc::Sender<T>> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| TallyError::ChannelMissing {
                name: name.to_string(),
            })
    }

    /// Remove a name from the registry, dropping the registry's own sender.
    /// Returns whether the name existed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.lock().remove(name).is_some();
        if removed {
            debug!(channel = name, "removed named channel");
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::Sender<T>>> {
        // Lock is only held for map operations; a poisoned lock means a
        // panic mid-insert, which already aborts the run.
        match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Scoped cleanup of a run's named channels.
///
/// Named channels are shared resources leaked into later runs if any step
/// fails; holding this guard for the lifetime of a run removes them on
/// every exit path, including error returns and unwinding.
pub struct RegistryGuard<T: Send + 'static> {
    registry: NamedChannelRegistry<T>,
    names: Vec<String>,
}

impl<T: Send + 'static> RegistryGuard<T> {
    pub fn new(registry: NamedChannelRegistry<T>, names: Vec<String>) -> Self {
        Self { registry, names }
    }
}

impl<T: Send + 'static> Drop for RegistryGuard<T> {
    fn drop(&mut self) {
        for name in &self.names {
            self.registry.remove(name);
        }
    }
}
