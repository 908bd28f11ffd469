use super::{ApplicationStore, ChangeEvent, RoleStore, CHANGE_FEED_CAPACITY};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationPatch, ApplicationStatus, CandidateSnapshot,
    NewApplication, OfferLetterChange,
};
use crate::models::role_marker::{HrRoleMarker, HR_ROLE_NAMESPACE};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgListener;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

const CHANGE_CHANNEL: &str = "applications_changed";

const APPLICATION_COLUMNS: &str = "id, candidate_id, job_id, job_role, submission_date, status, answers, \
     candidate_first_name, candidate_last_name, candidate_email, offer_letter_url";

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    candidate_id: String,
    job_id: String,
    job_role: String,
    submission_date: DateTime<Utc>,
    status: String,
    answers: String,
    candidate_first_name: String,
    candidate_last_name: String,
    candidate_email: String,
    offer_letter_url: Option<String>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        let status = row.status.parse::<ApplicationStatus>().map_err(|e: String| {
            Error::Internal(format!("application {} has a corrupt status: {}", row.id, e))
        })?;
        Ok(Application {
            id: row.id,
            candidate_id: row.candidate_id,
            job_id: row.job_id,
            job_role: row.job_role,
            submission_date: row.submission_date,
            status,
            answers: row.answers,
            candidate: CandidateSnapshot {
                first_name: row.candidate_first_name,
                last_name: row.candidate_last_name,
                email: row.candidate_email,
            },
            offer_letter_url: row.offer_letter_url,
        })
    }
}

#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, changes }
    }

    /// Forwards `applications_changed` notifications into the change feed,
    /// reconnecting after listener failures.
    pub fn spawn_change_listener(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let changes = self.changes.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = forward_notifications(&pool, &changes).await {
                    tracing::error!(error = ?e, "application change listener failed");
                }
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        })
    }
}

async fn forward_notifications(
    pool: &PgPool,
    changes: &broadcast::Sender<ChangeEvent>,
) -> Result<()> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    tracing::info!(channel = CHANGE_CHANNEL, "listening for application changes");
    // Notifications sent while no listener was attached are gone.
    announce_resync(changes);
    loop {
        let notification = listener.recv().await?;
        match ChangeEvent::from_notification(notification.payload()) {
            Some(event) => {
                let _ = changes.send(event);
            }
            None => tracing::warn!(
                payload = notification.payload(),
                "ignoring malformed change notification"
            ),
        }
    }
}

fn announce_resync(changes: &broadcast::Sender<ChangeEvent>) {
    let subscribers = changes.send(ChangeEvent::Resync).unwrap_or(0);
    tracing::debug!(subscribers, "change listener attached; asked live views to resync");
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    /// Idempotent on `new.id`: replaying a create that already landed returns
    /// the stored record instead of inserting a duplicate.
    async fn create(&self, new: NewApplication) -> Result<Application> {
        let query = format!(
            "INSERT INTO applications (
                id, candidate_id, job_id, job_role, submission_date, status, answers,
                candidate_first_name, candidate_last_name, candidate_email
             ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
             ON CONFLICT (id) DO NOTHING
             RETURNING {}",
            APPLICATION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(new.id)
            .bind(&new.candidate_id)
            .bind(&new.job_id)
            .bind(&new.job_role)
            .bind(new.submission_date)
            .bind(new.status.as_str())
            .bind(&new.answers)
            .bind(&new.candidate.first_name)
            .bind(&new.candidate.last_name)
            .bind(&new.candidate.email)
            .fetch_optional(&self.pool)
            .await?;
        match inserted {
            Some(row) => row.try_into(),
            None => self
                .get(new.id)
                .await?
                .ok_or_else(|| Error::Internal(format!("application {} vanished after insert", new.id))),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Application>> {
        let query = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        let row = sqlx::query_as::<_, ApplicationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Application::try_from).transpose()
    }

    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let where_clause = if filter.candidate_id.is_some() {
            "WHERE candidate_id = $1"
        } else {
            ""
        };
        let query = format!(
            "SELECT {} FROM applications {} ORDER BY submission_date DESC",
            APPLICATION_COLUMNS, where_clause
        );
        let mut statement = sqlx::query_as::<_, ApplicationRow>(&query);
        if let Some(owner) = &filter.candidate_id {
            statement = statement.bind(owner);
        }
        let rows = statement.fetch_all(&self.pool).await?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn update(&self, id: Uuid, patch: ApplicationPatch) -> Result<Application> {
        if patch.is_empty() {
            return self
                .get(id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)));
        }

        let mut assignments = Vec::new();
        let mut args: Vec<String> = Vec::new();
        if let Some(status) = patch.status {
            args.push(status.as_str().to_string());
            assignments.push(format!("status = ${}", args.len() + 1));
        }
        match patch.offer_letter_url {
            OfferLetterChange::Keep => {}
            OfferLetterChange::Set(url) => {
                args.push(url);
                assignments.push(format!("offer_letter_url = ${}", args.len() + 1));
            }
            OfferLetterChange::Clear => assignments.push("offer_letter_url = NULL".to_string()),
        }

        let query = format!(
            "UPDATE applications SET {} WHERE id = $1 RETURNING {}",
            assignments.join(", "),
            APPLICATION_COLUMNS
        );
        let mut statement = sqlx::query_as::<_, ApplicationRow>(&query).bind(id);
        for value in &args {
            statement = statement.bind(value);
        }
        let row = statement
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))?;
        row.try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Application {} not found", id)));
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn hr_marker(&self, uid: &str) -> Result<Option<HrRoleMarker>> {
        let query = format!(
            "SELECT uid, created_at FROM {} WHERE uid = $1",
            HR_ROLE_NAMESPACE
        );
        let marker = sqlx::query_as::<_, HrRoleMarker>(&query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(marker)
    }
}
