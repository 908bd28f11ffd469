use crate::database::ApplicationStore;
use crate::dto::application_dto::{SubmitApplicationPayload, UpdateStatusPayload};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationStatus, NewApplication, DEFAULT_JOB_ID,
};
use crate::services::role_resolver::{Caller, RoleResolver};
use crate::services::status_machine::StatusMachine;
use crate::services::write_dispatch::{PendingWrite, WriteDispatcher};
use crate::utils::{time, validation};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use uuid::Uuid;

/// Which slice of the collection a list or live view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Own,
    All,
}

/// Continuously updated view: one full snapshot up front, then a fresh one
/// after every change to the collection.
pub type LiveApplications = BoxStream<'static, Result<Vec<Application>>>;

#[derive(Clone)]
pub struct ApplicationWorkflow {
    store: Arc<dyn ApplicationStore>,
    roles: RoleResolver,
    machine: StatusMachine,
    writes: WriteDispatcher,
}

impl ApplicationWorkflow {
    pub fn new(
        store: Arc<dyn ApplicationStore>,
        roles: RoleResolver,
        machine: StatusMachine,
        writes: WriteDispatcher,
    ) -> Self {
        Self {
            store,
            roles,
            machine,
            writes,
        }
    }

    pub fn roles(&self) -> &RoleResolver {
        &self.roles
    }

    pub async fn submit(
        &self,
        caller: &Caller,
        payload: SubmitApplicationPayload,
    ) -> Result<Application> {
        let identity = caller.require_identity()?;
        let payload = payload.normalized();
        validation::validate(&payload)?;
        validation::require_web_link("resume_url", payload.resume_url.as_deref())?;

        let new = NewApplication {
            id: Uuid::new_v4(),
            candidate_id: identity.uid.clone(),
            job_id: payload
                .job_id
                .clone()
                .unwrap_or_else(|| DEFAULT_JOB_ID.to_string()),
            job_role: payload.job_role.clone(),
            submission_date: time::now(),
            status: ApplicationStatus::Applied,
            answers: serde_json::to_string(&payload)?,
            candidate: payload.snapshot(),
        };

        let store = self.store.clone();
        let application = self
            .writes
            .dispatch("submit application", move |_| {
                let store = store.clone();
                let new = new.clone();
                async move { store.create(new).await }
            })
            .outcome()
            .await?;

        tracing::info!(
            application_id = %application.id,
            candidate_id = %application.candidate_id,
            job_role = %application.job_role,
            "application submitted"
        );
        Ok(application)
    }

    pub async fn list_own(&self, caller: &Caller) -> Result<Vec<Application>> {
        let identity = caller.require_identity()?;
        self.store
            .list(&ApplicationFilter::owned_by(identity.uid.clone()))
            .await
    }

    pub async fn list_all(&self, caller: &Caller) -> Result<Vec<Application>> {
        caller.require_hr(&self.roles).await?;
        self.store.list(&ApplicationFilter::all()).await
    }

    /// Single application, readable by its owner or by HR.
    pub async fn get(&self, caller: &Caller, id: Uuid) -> Result<Application> {
        let identity = caller.require_identity()?;
        let application = self.find(id).await?;
        if application.candidate_id != identity.uid && !caller.is_hr(&self.roles).await {
            return Err(Error::Forbidden(
                "You can only view your own applications.".to_string(),
            ));
        }
        Ok(application)
    }

    /// Authorizes and validates the edit, then dispatches the write.
    pub async fn begin_update_status(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateStatusPayload,
    ) -> Result<PendingWrite<Application>> {
        let actor = caller.require_hr(&self.roles).await?.uid.clone();
        let payload = payload.normalized();
        validation::validate(&payload)?;
        validation::require_web_link("offer_letter_url", payload.offer_letter_url.as_deref())?;

        let current = self.find(id).await?;
        let patch = self
            .machine
            .transition(current.status, payload.status, payload.offer_letter_url)?;

        let store = self.store.clone();
        let from = current.status;
        Ok(self.writes.dispatch("update application status", move |_| {
            let store = store.clone();
            let patch = patch.clone();
            let actor = actor.clone();
            async move {
                let updated = store.update(id, patch).await?;
                tracing::info!(
                    application_id = %id,
                    hr_uid = %actor,
                    from = %from,
                    to = %updated.status,
                    "application status updated"
                );
                Ok(updated)
            }
        }))
    }

    pub async fn update_status(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateStatusPayload,
    ) -> Result<Application> {
        self.begin_update_status(caller, id, payload)
            .await?
            .outcome()
            .await
    }

    /// Owner-initiated hard delete.
    pub async fn begin_withdraw(&self, caller: &Caller, id: Uuid) -> Result<PendingWrite<()>> {
        let identity = caller.require_identity()?;
        let application = self.find(id).await?;
        if application.candidate_id != identity.uid {
            return Err(Error::Forbidden(
                "You can only withdraw your own applications.".to_string(),
            ));
        }
        Ok(self.dispatch_delete("withdraw application", id, identity.uid.clone()))
    }

    pub async fn withdraw(&self, caller: &Caller, id: Uuid) -> Result<()> {
        self.begin_withdraw(caller, id).await?.outcome().await
    }

    /// HR-initiated hard delete; unconditional once the role is established.
    pub async fn begin_remove(&self, caller: &Caller, id: Uuid) -> Result<PendingWrite<()>> {
        let actor = caller.require_hr(&self.roles).await?.uid.clone();
        Ok(self.dispatch_delete("remove application", id, actor))
    }

    pub async fn remove(&self, caller: &Caller, id: Uuid) -> Result<()> {
        self.begin_remove(caller, id).await?.outcome().await
    }

    pub async fn subscribe(&self, caller: &Caller, scope: Scope) -> Result<LiveApplications> {
        let filter = match scope {
            Scope::Own => ApplicationFilter::owned_by(caller.require_identity()?.uid.clone()),
            Scope::All => {
                caller.require_hr(&self.roles).await?;
                ApplicationFilter::all()
            }
        };
        Ok(live_view(self.store.clone(), filter))
    }

    async fn find(&self, id: Uuid) -> Result<Application> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))
    }

    fn dispatch_delete(&self, label: &'static str, id: Uuid, actor: String) -> PendingWrite<()> {
        let store = self.store.clone();
        self.writes.dispatch(label, move |attempt| {
            let store = store.clone();
            let actor = actor.clone();
            async move {
                match store.delete(id).await {
                    Ok(()) => {}
                    // An earlier attempt may have landed before its response was lost.
                    Err(Error::NotFound(_)) if attempt > 1 => {}
                    Err(e) => return Err(e),
                }
                tracing::info!(application_id = %id, actor = %actor, action = label, "application deleted");
                Ok(())
            }
        })
    }
}

fn live_view(store: Arc<dyn ApplicationStore>, filter: ApplicationFilter) -> LiveApplications {
    // Subscribe before the first snapshot so no change can slip in between.
    let changes = BroadcastStream::new(store.changes());
    let initial = {
        let store = store.clone();
        let filter = filter.clone();
        stream::once(async move { store.list(&filter).await })
    };
    let updates = changes.then(move |change| {
        let store = store.clone();
        let filter = filter.clone();
        async move {
            match change {
                Ok(event) => {
                    tracing::debug!(application_id = ?event.id(), ?event, "live view refreshing")
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live view lagged; resynchronising")
                }
            }
            store.list(&filter).await
        }
    });
    initial.chain(updates).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteRetry;
    use crate::database::memory::{MemoryApplicationStore, MemoryRoleStore};
    use crate::database::ChangeEvent;
    use crate::models::identity::Identity;
    use std::time::Duration;

    async fn workflow() -> ApplicationWorkflow {
        let roles = MemoryRoleStore::seeded(["hr-1"]).await;
        ApplicationWorkflow::new(
            Arc::new(MemoryApplicationStore::new()),
            RoleResolver::new(Arc::new(roles), Duration::from_millis(200)),
            StatusMachine::default(),
            WriteDispatcher::new(WriteRetry::default()),
        )
    }

    fn form(first: &str) -> SubmitApplicationPayload {
        SubmitApplicationPayload {
            first_name: first.to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            resume_url: None,
            job_role: "Backend Developer".to_string(),
            job_id: None,
        }
    }

    #[tokio::test]
    async fn submit_requires_identity() {
        let wf = workflow().await;
        let err = wf.submit(&Caller::anonymous(), form("Ada")).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn invalid_submission_never_reaches_the_store() {
        let wf = workflow().await;
        let caller = Caller::authenticated(Identity::new("cand-1"));
        let mut bad = form("Ada");
        bad.email = "nope".to_string();
        let err = wf.submit(&caller, bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(wf.list_own(&caller).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn answers_keep_the_submitted_form() {
        let wf = workflow().await;
        let caller = Caller::authenticated(Identity::new("cand-1"));
        let mut values = form("Ada");
        values.phone = Some("+1 555 0100".to_string());
        let app = wf.submit(&caller, values).await.unwrap();

        let answers: serde_json::Value = serde_json::from_str(&app.answers).unwrap();
        assert_eq!(answers["phone"], "+1 555 0100");
        assert_eq!(answers["job_role"], "Backend Developer");
        assert_eq!(app.job_id, DEFAULT_JOB_ID);
    }

    #[tokio::test]
    async fn live_view_emits_snapshot_then_each_change() {
        let wf = workflow().await;
        let caller = Caller::authenticated(Identity::new("cand-1"));
        let mut live = wf.subscribe(&caller, Scope::Own).await.unwrap();

        assert!(live.next().await.unwrap().unwrap().is_empty());

        let app = wf.submit(&caller, form("Ada")).await.unwrap();
        let snapshot = live.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, app.id);

        wf.withdraw(&caller, app.id).await.unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hr_live_view_requires_role() {
        let wf = workflow().await;
        let applicant = Caller::authenticated(Identity::new("cand-1"));
        assert!(matches!(
            wf.subscribe(&applicant, Scope::All).await,
            Err(Error::Forbidden(_))
        ));
        let hr = Caller::authenticated(Identity::new("hr-1"));
        assert!(wf.subscribe(&hr, Scope::All).await.is_ok());
    }

    #[tokio::test]
    async fn get_is_limited_to_owner_and_hr() {
        let wf = workflow().await;
        let owner = Caller::authenticated(Identity::new("cand-1"));
        let app = wf.submit(&owner, form("Ada")).await.unwrap();

        assert_eq!(wf.get(&owner, app.id).await.unwrap().id, app.id);
        let hr = Caller::authenticated(Identity::new("hr-1"));
        assert_eq!(wf.get(&hr, app.id).await.unwrap().id, app.id);
        let stranger = Caller::authenticated(Identity::new("cand-2"));
        assert!(matches!(
            wf.get(&stranger, app.id).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn resync_event_refreshes_the_live_view() {
        let store = Arc::new(MemoryApplicationStore::new());
        let mut live = live_view(store.clone(), ApplicationFilter::all());
        assert!(live.next().await.unwrap().unwrap().is_empty());

        store.publish(ChangeEvent::Resync);
        assert!(live.next().await.unwrap().unwrap().is_empty());
    }
}
