use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Job reference written when the submission does not name a concrete posting.
pub const DEFAULT_JOB_ID: &str = "default-job-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Offered,
    Rejected,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Applied,
            Self::Interviewing,
            Self::Offered,
            Self::Rejected,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Interviewing => "Interviewing",
            Self::Offered => "Offered",
            Self::Rejected => "Rejected",
        }
    }

    /// Badge variant the dashboards render the status with.
    pub const fn badge_variant(self) -> &'static str {
        match self {
            Self::Applied => "outline",
            Self::Interviewing => "secondary",
            Self::Offered => "default",
            Self::Rejected => "destructive",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ordered()
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown application status '{}'", s))
    }
}

/// Point-in-time copy of the candidate's name and email taken at submission.
///
/// Written once together with the application and never refreshed from a
/// profile afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CandidateSnapshot {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl CandidateSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: String,
    pub job_id: String,
    pub job_role: String,
    pub submission_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub answers: String,
    pub candidate: CandidateSnapshot,
    pub offer_letter_url: Option<String>,
}

/// Everything the store needs to create a record.
///
/// The id is chosen by the caller so a retried create can be recognised as
/// the same record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub id: Uuid,
    pub candidate_id: String,
    pub job_id: String,
    pub job_role: String,
    pub submission_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub answers: String,
    pub candidate: CandidateSnapshot,
}

impl NewApplication {
    pub fn into_application(self) -> Application {
        Application {
            id: self.id,
            candidate_id: self.candidate_id,
            job_id: self.job_id,
            job_role: self.job_role,
            submission_date: self.submission_date,
            status: self.status,
            answers: self.answers,
            candidate: self.candidate,
            offer_letter_url: None,
        }
    }
}

/// Partial update. Only `status` and `offer_letter_url` are mutable after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub offer_letter_url: OfferLetterChange,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum OfferLetterChange {
    #[default]
    Keep,
    Set(String),
    Clear,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.offer_letter_url == OfferLetterChange::Keep
    }

    pub fn apply_to(&self, application: &mut Application) {
        if let Some(status) = self.status {
            application.status = status;
        }
        match &self.offer_letter_url {
            OfferLetterChange::Keep => {}
            OfferLetterChange::Set(url) => application.offer_letter_url = Some(url.clone()),
            OfferLetterChange::Clear => application.offer_letter_url = None,
        }
    }
}

/// Equality filters supported by list and subscription queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub candidate_id: Option<String>,
}

impl ApplicationFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: Some(candidate_id.into()),
        }
    }

    pub fn matches(&self, application: &Application) -> bool {
        self.candidate_id
            .as_deref()
            .map_or(true, |owner| application.candidate_id == owner)
    }
}
