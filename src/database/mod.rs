//! Persistence adapters for the applications collection and the HR role namespace.
//!
//! Both stores are consumed through traits so the workflow can be wired against
//! PostgreSQL in production and the in-memory backend in tests and local runs.

pub mod memory;
pub mod pool;
pub mod postgres;

use crate::error::Result;
use crate::models::application::{Application, ApplicationFilter, ApplicationPatch, NewApplication};
use crate::models::role_marker::HrRoleMarker;
use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the change-feed channel. Slow subscribers that fall further
/// behind than this resynchronise from a fresh snapshot.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(Uuid),
    Updated(Uuid),
    Deleted(Uuid),
    /// Changes may have been missed (listener reconnect); subscribers should
    /// re-read everything.
    Resync,
}

impl ChangeEvent {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            ChangeEvent::Created(id) | ChangeEvent::Updated(id) | ChangeEvent::Deleted(id) => {
                Some(*id)
            }
            ChangeEvent::Resync => None,
        }
    }

    /// Parses the `<op>:<uuid>` payload emitted by the `applications_changed` trigger.
    pub fn from_notification(payload: &str) -> Option<Self> {
        let (op, id) = payload.split_once(':')?;
        let id = Uuid::parse_str(id.trim()).ok()?;
        match op {
            "created" => Some(ChangeEvent::Created(id)),
            "updated" => Some(ChangeEvent::Updated(id)),
            "deleted" => Some(ChangeEvent::Deleted(id)),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn create(&self, new: NewApplication) -> Result<Application>;

    async fn get(&self, id: Uuid) -> Result<Option<Application>>;

    /// Newest submissions first.
    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>>;

    /// Applies a partial update. Fails with `NotFound` when the id is absent.
    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<Application>;

    /// Hard delete. Fails with `NotFound` when the id is absent.
    async fn delete(&self, id: Uuid) -> Result<()>;

    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn hr_marker(&self, uid: &str) -> Result<Option<HrRoleMarker>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trigger_payloads() {
        let id = Uuid::new_v4();
        assert_eq!(
            ChangeEvent::from_notification(&format!("created:{}", id)),
            Some(ChangeEvent::Created(id))
        );
        assert_eq!(
            ChangeEvent::from_notification(&format!("deleted:{}", id)),
            Some(ChangeEvent::Deleted(id))
        );
        assert_eq!(ChangeEvent::from_notification("truncated:nope"), None);
        assert_eq!(ChangeEvent::from_notification("garbage"), None);
        assert_eq!(ChangeEvent::Updated(id).id(), Some(id));
        assert_eq!(ChangeEvent::Resync.id(), None);
    }
}
