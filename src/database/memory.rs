use super::{ApplicationStore, ChangeEvent, RoleStore, CHANGE_FEED_CAPACITY};
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationFilter, ApplicationPatch, NewApplication};
use crate::models::role_marker::HrRoleMarker;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

pub struct MemoryApplicationStore {
    records: RwLock<HashMap<Uuid, Application>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryApplicationStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        // No receivers is fine; subscriptions come and go.
        let _ = self.changes.send(event);
    }
}

impl Default for MemoryApplicationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn create(&self, new: NewApplication) -> Result<Application> {
        let application = {
            let mut records = self.records.write().await;
            if let Some(existing) = records.get(&new.id) {
                return Ok(existing.clone());
            }
            let application = new.into_application();
            records.insert(application.id, application.clone());
            application
        };
        self.publish(ChangeEvent::Created(application.id));
        Ok(application)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let mut items: Vec<Application> = self
            .records
            .read()
            .await
            .values()
            .filter(|app| filter.matches(app))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        Ok(items)
    }

    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<Application> {
        let updated = {
            let mut records = self.records.write().await;
            let application = records
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))?;
            patch.apply_to(application);
            application.clone()
        };
        self.publish(ChangeEvent::Updated(id));
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let removed = self.records.write().await.remove(&id);
        if removed.is_none() {
            return Err(Error::NotFound(format!("Application {} not found", id)));
        }
        self.publish(ChangeEvent::Deleted(id));
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

/// Role markers held in memory. Markers are provisioned out-of-band, either
/// from configuration at startup or directly by tests.
#[derive(Default)]
pub struct MemoryRoleStore {
    markers: RwLock<HashMap<String, HrRoleMarker>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seeded<I, S>(uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for uid in uids {
            store.grant(uid).await;
        }
        store
    }

    pub async fn grant(&self, uid: impl Into<String>) {
        let uid = uid.into();
        self.markers.write().await.insert(
            uid.clone(),
            HrRoleMarker {
                uid,
                created_at: Some(Utc::now()),
            },
        );
    }

    pub async fn revoke(&self, uid: &str) {
        self.markers.write().await.remove(uid);
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn hr_marker(&self, uid: &str) -> Result<Option<HrRoleMarker>> {
        Ok(self.markers.read().await.get(uid).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::{
        ApplicationStatus, CandidateSnapshot, OfferLetterChange, DEFAULT_JOB_ID,
    };
    use chrono::Duration;

    fn new_app(owner: &str, minutes_ago: i64) -> NewApplication {
        NewApplication {
            id: Uuid::new_v4(),
            candidate_id: owner.to_string(),
            job_id: DEFAULT_JOB_ID.to_string(),
            job_role: "Software Engineer".to_string(),
            submission_date: Utc::now() - Duration::minutes(minutes_ago),
            status: ApplicationStatus::Applied,
            answers: "{}".to_string(),
            candidate: CandidateSnapshot {
                first_name: "Grace".to_string(),
                last_name: "Hopper".to_string(),
                email: "grace@example.com".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn list_filters_by_owner_newest_first() {
        let store = MemoryApplicationStore::new();
        let older = store.create(new_app("a", 10)).await.unwrap();
        let newer = store.create(new_app("a", 1)).await.unwrap();
        store.create(new_app("b", 5)).await.unwrap();

        let own = store.list(&ApplicationFilter::owned_by("a")).await.unwrap();
        assert_eq!(
            own.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        assert_eq!(store.list(&ApplicationFilter::all()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_ids() {
        let store = MemoryApplicationStore::new();
        let missing = Uuid::new_v4();
        let err = store
            .update(missing, ApplicationPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            store.delete(missing).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn writes_are_published_on_the_change_feed() {
        let store = MemoryApplicationStore::new();
        let mut feed = store.changes();

        let app = store.create(new_app("a", 0)).await.unwrap();
        store
            .update(
                app.id,
                ApplicationPatch {
                    status: Some(ApplicationStatus::Interviewing),
                    offer_letter_url: OfferLetterChange::Keep,
                },
            )
            .await
            .unwrap();
        store.delete(app.id).await.unwrap();

        assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Created(app.id));
        assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Updated(app.id));
        assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Deleted(app.id));
    }

    #[tokio::test]
    async fn creating_the_same_id_twice_keeps_one_record() {
        let store = MemoryApplicationStore::new();
        let mut feed = store.changes();
        let new = new_app("a", 0);

        let first = store.create(new.clone()).await.unwrap();
        let second = store.create(new).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list(&ApplicationFilter::all()).await.unwrap().len(), 1);
        assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Created(first.id));
        assert!(feed.try_recv().is_err());
    }

    #[tokio::test]
    async fn role_markers_are_presence_only() {
        let roles = MemoryRoleStore::seeded(["hr-1"]).await;
        assert!(roles.hr_marker("hr-1").await.unwrap().is_some());
        assert!(roles.hr_marker("someone").await.unwrap().is_none());
        roles.revoke("hr-1").await;
        assert!(roles.hr_marker("hr-1").await.unwrap().is_none());
    }
}
