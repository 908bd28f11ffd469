pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::{Config, StoreBackend};
use crate::database::memory::{MemoryApplicationStore, MemoryRoleStore};
use crate::database::postgres::{PgApplicationStore, PgRoleStore};
use crate::database::{pool, ApplicationStore, RoleStore};
use crate::error::{Error, Result};
use crate::services::{
    application_workflow::ApplicationWorkflow, role_resolver::RoleResolver,
    status_machine::StatusMachine, write_dispatch::WriteDispatcher,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub workflow: ApplicationWorkflow,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(
        config: &Config,
        applications: Arc<dyn ApplicationStore>,
        roles: Arc<dyn RoleStore>,
    ) -> Self {
        let workflow = ApplicationWorkflow::new(
            applications,
            RoleResolver::new(roles, config.role_check_timeout),
            StatusMachine::new(config.transition_policy, config.offer_letter_policy),
            WriteDispatcher::new(config.write_retry),
        );
        Self {
            workflow,
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
        }
    }

    /// Wires the configured backend. For PostgreSQL this also runs migrations
    /// and starts the change-feed listener.
    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.store_backend {
            StoreBackend::Memory => {
                tracing::info!(hr_markers = config.hr_uids.len(), "using in-memory store");
                let roles = MemoryRoleStore::seeded(config.hr_uids.iter().cloned()).await;
                Ok(Self::new(
                    config,
                    Arc::new(MemoryApplicationStore::new()),
                    Arc::new(roles),
                ))
            }
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?;
                let pool = pool::create_pool(url).await?;
                pool::run_migrations(&pool).await?;

                let applications = PgApplicationStore::new(pool.clone());
                applications.spawn_change_listener();
                Ok(Self::new(
                    config,
                    Arc::new(applications),
                    Arc::new(PgRoleStore::new(pool)),
                ))
            }
        }
    }
}
