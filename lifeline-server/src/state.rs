//! Application state shared across all request handlers.

use crate::config::runtime::RuntimeConfig;
use lifeline_core::auth::RoleGuard;
use lifeline_core::dispatch::NotificationHub;
use lifeline_core::entities::Role;
use lifeline_core::error::CoreError;
use lifeline_core::store::Store;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Pre-built role guards, one per protected route group. Construction
/// validates every allow-list up front.
pub struct Guards {
    pub donor: RoleGuard,
    pub patient: RoleGuard,
    pub driver: RoleGuard,
    pub admin: RoleGuard,
}

impl Guards {
    pub fn new() -> Result<Self, CoreError> {
        Ok(Self {
            donor: RoleGuard::new(&[Role::Donor])?,
            patient: RoleGuard::new(&[Role::Patient])?,
            driver: RoleGuard::new(&[Role::Driver])?,
            admin: RoleGuard::new(&[Role::Admin])?,
        })
    }
}

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind
/// Arc).
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend (Postgres in production, in-memory in
    /// `--memory` mode).
    pub store: Arc<dyn Store>,
    /// The process-wide notification hub, initialized once in main.
    pub hub: Arc<NotificationHub>,
    /// Runtime configuration (can be reloaded via SIGHUP).
    pub config: Arc<RwLock<RuntimeConfig>>,
    /// Role guards for the protected route groups.
    pub guards: Arc<Guards>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        hub: Arc<NotificationHub>,
        config: RuntimeConfig,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            store,
            hub,
            config: Arc::new(RwLock::new(config)),
            guards: Arc::new(Guards::new()?),
        })
    }

    /// Update the configuration (used during SIGHUP reload).
    pub async fn update_config(&self, new_config: RuntimeConfig) {
        let mut config = self.config.write().await;
        *config = new_config;
    }
}
