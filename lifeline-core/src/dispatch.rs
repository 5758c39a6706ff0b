//! Process-wide notification hub.
//!
//! One hub instance is constructed at startup and handed by reference
//! to every component that publishes or subscribes; no component
//! reaches a global handle. The hub starts uninitialized and every
//! publish or subscribe fails fast with [`DispatchError::NotInitialized`]
//! until [`NotificationHub::initialize`] wires the connection registry,
//! so "published before startup finished" is a representable, testable
//! state rather than a crash.
//!
//! Delivery is best-effort: sends never block, a slow subscriber's
//! frame is dropped with a warning, and events raised while an account
//! is disconnected are not queued or retried.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use lifeline_sdk::objects::ServerEvent;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::entities::{BloodGroup, Role};

/// Per-connection event buffer. Enough to absorb bursts while keeping
/// memory bounded.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Identity snapshot captured when a client joins its channel, used by
/// broadcast eligibility predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    pub account_id: Uuid,
    pub role: Role,
    /// Present for donor connections.
    pub blood_group: Option<BloodGroup>,
    pub is_available: bool,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("notification hub is not initialized")]
    NotInitialized,
    #[error("notification hub is already initialized")]
    AlreadyInitialized,
}

struct Connection {
    id: u64,
    profile: ClientProfile,
    tx: mpsc::Sender<ServerEvent>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<Uuid, Vec<Connection>>,
}

/// A live subscription to one account's private channel.
pub struct Subscription {
    pub connection_id: u64,
    pub events: mpsc::Receiver<ServerEvent>,
}

#[derive(Default)]
pub struct NotificationHub {
    registry: RwLock<Option<Registry>>,
    next_connection_id: AtomicU64,
}

impl NotificationHub {
    /// Create an uninitialized hub. Every operation fails with
    /// `NotInitialized` until [`initialize`](Self::initialize) runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the connection registry. Called exactly once at process
    /// start; a second call is an error.
    pub async fn initialize(&self) -> Result<(), DispatchError> {
        let mut registry = self.registry.write().await;
        if registry.is_some() {
            return Err(DispatchError::AlreadyInitialized);
        }
        *registry = Some(Registry::default());
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.registry.read().await.is_some()
    }

    /// Subscribe a connection to its account's private channel.
    pub async fn join(&self, profile: ClientProfile) -> Result<Subscription, DispatchError> {
        let mut registry = self.registry.write().await;
        let registry = registry.as_mut().ok_or(DispatchError::NotInitialized)?;

        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, events) = mpsc::channel(SUBSCRIBER_BUFFER);
        registry
            .connections
            .entry(profile.account_id)
            .or_default()
            .push(Connection { id, profile, tx });

        Ok(Subscription {
            connection_id: id,
            events,
        })
    }

    /// Drop one connection. A no-op for unknown ids or an
    /// uninitialized hub.
    pub async fn leave(&self, account_id: Uuid, connection_id: u64) {
        let mut registry = self.registry.write().await;
        let Some(registry) = registry.as_mut() else {
            return;
        };
        if let Some(connections) = registry.connections.get_mut(&account_id) {
            connections.retain(|c| c.id != connection_id);
            if connections.is_empty() {
                registry.connections.remove(&account_id);
            }
        }
    }

    /// Push an event to every connected client whose identity snapshot
    /// satisfies `filter`. Returns the number of frames handed off.
    pub async fn broadcast_to_eligible<F>(
        &self,
        event: &ServerEvent,
        filter: F,
    ) -> Result<usize, DispatchError>
    where
        F: Fn(&ClientProfile) -> bool,
    {
        let mut registry = self.registry.write().await;
        let registry = registry.as_mut().ok_or(DispatchError::NotInitialized)?;

        let mut delivered = 0usize;
        for connections in registry.connections.values_mut() {
            connections.retain(|c| !c.tx.is_closed());
            for connection in connections.iter() {
                if !filter(&connection.profile) {
                    continue;
                }
                match connection.tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            account_id = %connection.profile.account_id,
                            "subscriber buffer full, dropping event"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }
        registry.connections.retain(|_, v| !v.is_empty());
        Ok(delivered)
    }

    /// Push an event to one account's connections. Returns whether at
    /// least one frame was handed off; a disconnected account is a
    /// silent drop, not an error.
    pub async fn notify_account(
        &self,
        account_id: Uuid,
        event: ServerEvent,
    ) -> Result<bool, DispatchError> {
        let mut registry = self.registry.write().await;
        let registry = registry.as_mut().ok_or(DispatchError::NotInitialized)?;

        let mut delivered = false;
        if let Some(connections) = registry.connections.get_mut(&account_id) {
            connections.retain(|c| !c.tx.is_closed());
            for connection in connections.iter() {
                match connection.tx.try_send(event.clone()) {
                    Ok(()) => delivered = true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            %account_id,
                            "subscriber buffer full, dropping event"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
            if connections.is_empty() {
                registry.connections.remove(&account_id);
            }
        }
        if !delivered {
            tracing::debug!(%account_id, "no active connection, event dropped");
        }
        Ok(delivered)
    }
}
