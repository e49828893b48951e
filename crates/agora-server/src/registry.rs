//! Process-local directory of connected users.
//!
//! Every live realtime session owns exactly one [`Connection`] and registers
//! it here for the lifetime of its read loop. The fan-out path looks
//! participants up one at a time; the map itself never leaves this module.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agora_shared::UserId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::error::DeliveryError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one session's outbound queue.
///
/// Cloning is cheap; every clone feeds the same writer task.
#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    user: UserId,
    tx: mpsc::Sender<Arc<str>>,
}

impl Connection {
    pub fn new(user: UserId, tx: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            user,
            tx,
        }
    }

    /// Create a connection together with the receiving end of its queue.
    pub fn channel(user: UserId, capacity: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(user, tx), rx)
    }

    /// Process-unique id, distinguishing two sessions of the same user.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    /// Queue a pre-encoded frame. Never waits for the peer.
    pub fn send(&self, frame: Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Map from user to the connection that currently represents them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<UserId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // a poisoned lock is still safe to use.
    fn map(&self) -> MutexGuard<'_, HashMap<UserId, Connection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the entry for `connection.user()`.
    ///
    /// Returns the displaced connection, if any. It is not closed here; its
    /// own session notices and cleans up.
    pub fn register(&self, connection: Connection) -> Option<Connection> {
        self.map().insert(connection.user(), connection)
    }

    pub fn lookup(&self, user: UserId) -> Option<Connection> {
        self.map().get(&user).cloned()
    }

    /// Remove `user`'s entry. Absent users are a no-op.
    pub fn unregister(&self, user: UserId) -> bool {
        self.map().remove(&user).is_some()
    }

    /// Remove the entry only if it still points at `connection`.
    pub fn unregister_connection(&self, connection: &Connection) -> bool {
        let mut map = self.map();
        match map.get(&connection.user()) {
            Some(current) if current.id() == connection.id() => {
                map.remove(&connection.user());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Register `connection` and return a guard that unregisters it when
    /// dropped.
    pub fn attach(self: &Arc<Self>, connection: Connection) -> Registration {
        if let Some(previous) = self.register(connection.clone()) {
            debug!(
                user = %connection.user().short(),
                previous = previous.id(),
                current = connection.id(),
                "connection displaced by a newer session"
            );
        }
        Registration {
            registry: Arc::clone(self),
            connection,
        }
    }
}

/// Scoped registry entry owned by a session.
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    connection: Connection,
}

impl Registration {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let removed = self.registry.unregister_connection(&self.connection);
        debug!(
            user = %self.connection.user().short(),
            connection = self.connection.id(),
            removed,
            "connection unregistered"
        );
    }
}
