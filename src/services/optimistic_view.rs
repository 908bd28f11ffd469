//! Caller-local list of applications that reflects edits before the store
//! confirms them, and rolls them back when the store refuses.

use crate::error::Result;
use crate::models::application::Application;
use crate::services::notice::{Action, Notice};
use crate::services::write_dispatch::PendingWrite;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum LocalChange {
    Upsert(Application),
    Remove(Uuid),
}

fn apply_change(items: &mut HashMap<Uuid, Application>, change: &LocalChange) {
    match change {
        LocalChange::Upsert(app) => {
            items.insert(app.id, app.clone());
        }
        LocalChange::Remove(id) => {
            items.remove(id);
        }
    }
}

/// Receipt for an optimistic change, needed to commit or revert it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ChangeTicket(u64);

/// Confirmed state from the store plus the changes still in flight.
///
/// The visible list is always the confirmed state with every pending change
/// replayed in the order it was applied, so committing, reverting and
/// refreshing can happen in any order.
#[derive(Debug, Default)]
pub struct OptimisticView {
    confirmed: HashMap<Uuid, Application>,
    pending: BTreeMap<u64, LocalChange>,
    visible: HashMap<Uuid, Application>,
    next_ticket: u64,
}

impl OptimisticView {
    pub fn from_snapshot(items: Vec<Application>) -> Self {
        let mut view = Self::default();
        view.replace_snapshot(items);
        view
    }

    /// Newest submissions first, matching the store's list order.
    pub fn items(&self) -> Vec<&Application> {
        let mut items: Vec<&Application> = self.visible.values().collect();
        items.sort_by(|a, b| b.submission_date.cmp(&a.submission_date));
        items
    }

    pub fn get(&self, id: Uuid) -> Option<&Application> {
        self.visible.get(&id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn apply(&mut self, change: LocalChange) -> ChangeTicket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        apply_change(&mut self.visible, &change);
        self.pending.insert(ticket, change);
        ChangeTicket(ticket)
    }

    /// The store accepted the change; it becomes part of the confirmed state.
    pub fn commit(&mut self, ticket: ChangeTicket) {
        if let Some(change) = self.pending.remove(&ticket.0) {
            apply_change(&mut self.confirmed, &change);
            self.rebuild();
        }
    }

    pub fn revert(&mut self, ticket: ChangeTicket) {
        if self.pending.remove(&ticket.0).is_some() {
            self.rebuild();
        }
    }

    /// Replaces the confirmed state with a fresh snapshot from a live view.
    /// Changes still in flight stay applied on top.
    pub fn replace_snapshot(&mut self, items: Vec<Application>) {
        self.confirmed = items.into_iter().map(|app| (app.id, app)).collect();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let mut visible = self.confirmed.clone();
        for change in self.pending.values() {
            apply_change(&mut visible, change);
        }
        self.visible = visible;
    }

    /// Waits for the write, then commits or reverts the optimistic change.
    ///
    /// Always yields a notice for the user: `success` when the write landed,
    /// a destructive notice describing the failure otherwise.
    pub async fn reconcile<T>(
        &mut self,
        ticket: ChangeTicket,
        write: PendingWrite<T>,
        action: Action,
        success: Notice,
    ) -> (Result<T>, Notice) {
        let label = write.label();
        match write.outcome().await {
            Ok(value) => {
                self.commit(ticket);
                (Ok(value), success)
            }
            Err(e) => {
                tracing::warn!(write = label, error = %e, "write failed; reverting optimistic change");
                let notice = Notice::failure(action, &e);
                self.revert(ticket);
                (Err(e), notice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteRetry;
    use crate::error::Error;
    use crate::models::application::{ApplicationStatus, CandidateSnapshot};
    use crate::services::notice::NoticeVariant;
    use crate::services::write_dispatch::WriteDispatcher;
    use chrono::Utc;
    use std::time::Duration;

    fn app(status: ApplicationStatus) -> Application {
        Application {
            id: Uuid::new_v4(),
            candidate_id: "cand".into(),
            job_id: "default-job-id".into(),
            job_role: "Frontend Developer".into(),
            submission_date: Utc::now(),
            status,
            answers: "{}".into(),
            candidate: CandidateSnapshot {
                first_name: "Alan".into(),
                last_name: "Turing".into(),
                email: "alan@example.com".into(),
            },
            offer_letter_url: None,
        }
    }

    fn dispatcher() -> WriteDispatcher {
        WriteDispatcher::new(WriteRetry {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
        })
    }

    #[tokio::test]
    async fn failed_write_reverts_and_reports() {
        let original = app(ApplicationStatus::Applied);
        let mut view = OptimisticView::from_snapshot(vec![original.clone()]);

        let mut edited = original.clone();
        edited.status = ApplicationStatus::Interviewing;
        let ticket = view.apply(LocalChange::Upsert(edited));
        assert_eq!(
            view.get(original.id).unwrap().status,
            ApplicationStatus::Interviewing
        );

        let write = dispatcher().dispatch("update", |_| async {
            Err::<(), _>(Error::StoreUnavailable("offline".into()))
        });
        let (result, notice) = view
            .reconcile(ticket, write, Action::UpdateStatus, Notice::removed())
            .await;

        assert!(result.is_err());
        assert_eq!(notice.variant, NoticeVariant::Destructive);
        assert_eq!(notice.description, "Failed to update status. Please try again.");
        assert_eq!(view.get(original.id).unwrap().status, ApplicationStatus::Applied);
        assert!(!view.has_pending());
    }

    #[tokio::test]
    async fn successful_write_commits() {
        let original = app(ApplicationStatus::Applied);
        let mut view = OptimisticView::from_snapshot(vec![original.clone()]);
        let ticket = view.apply(LocalChange::Remove(original.id));
        assert!(view.items().is_empty());

        let write = dispatcher().dispatch("remove", |_| async { Ok(()) });
        let (result, notice) = view
            .reconcile(ticket, write, Action::Remove, Notice::removed())
            .await;

        assert!(result.is_ok());
        assert_eq!(notice.title, "Application Deleted");
        assert!(view.items().is_empty());
        assert!(!view.has_pending());
    }

    #[test]
    fn snapshot_refresh_keeps_in_flight_changes() {
        let original = app(ApplicationStatus::Applied);
        let mut view = OptimisticView::from_snapshot(vec![original.clone()]);
        let mut edited = original.clone();
        edited.status = ApplicationStatus::Rejected;
        let ticket = view.apply(LocalChange::Upsert(edited));

        let other = app(ApplicationStatus::Offered);
        view.replace_snapshot(vec![original.clone(), other.clone()]);
        assert_eq!(view.items().len(), 2);
        assert_eq!(
            view.get(original.id).unwrap().status,
            ApplicationStatus::Rejected
        );

        view.revert(ticket);
        assert_eq!(view.get(original.id).unwrap().status, ApplicationStatus::Applied);
        assert!(view.get(other.id).is_some());
    }

    #[test]
    fn stacked_edits_on_one_application_revert_to_the_store_value() {
        let original = app(ApplicationStatus::Applied);
        let mut view = OptimisticView::from_snapshot(vec![original.clone()]);

        let mut interviewing = original.clone();
        interviewing.status = ApplicationStatus::Interviewing;
        let first = view.apply(LocalChange::Upsert(interviewing));
        let mut offered = original.clone();
        offered.status = ApplicationStatus::Offered;
        let second = view.apply(LocalChange::Upsert(offered));

        view.replace_snapshot(vec![original.clone()]);
        assert_eq!(view.get(original.id).unwrap().status, ApplicationStatus::Offered);

        view.revert(second);
        assert_eq!(
            view.get(original.id).unwrap().status,
            ApplicationStatus::Interviewing
        );
        view.revert(first);
        assert_eq!(view.get(original.id).unwrap().status, ApplicationStatus::Applied);
        assert!(!view.has_pending());
    }

    #[test]
    fn reverting_the_older_edit_first_keeps_the_newer_one() {
        let original = app(ApplicationStatus::Applied);
        let mut view = OptimisticView::from_snapshot(vec![original.clone()]);

        let mut interviewing = original.clone();
        interviewing.status = ApplicationStatus::Interviewing;
        let first = view.apply(LocalChange::Upsert(interviewing));
        let mut rejected = original.clone();
        rejected.status = ApplicationStatus::Rejected;
        let second = view.apply(LocalChange::Upsert(rejected));

        view.revert(first);
        assert_eq!(view.get(original.id).unwrap().status, ApplicationStatus::Rejected);
        view.commit(second);
        view.replace_snapshot(vec![original.clone()]);
        assert_eq!(view.get(original.id).unwrap().status, ApplicationStatus::Applied);
    }
}
