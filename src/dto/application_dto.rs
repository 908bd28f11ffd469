use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::application::{Application, ApplicationStatus, CandidateSnapshot};
use crate::services::notice::Notice;
use crate::services::role_resolver::{Landing, Portal, RoleState};

/// Standard roles offered by the submission form.
pub const STANDARD_JOB_ROLES: [&str; 4] = [
    "Software Engineer",
    "Frontend Developer",
    "Backend Developer",
    "Full Stack Developer",
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitApplicationPayload {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Invalid URL"))]
    pub resume_url: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please select a job role."))]
    pub job_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl SubmitApplicationPayload {
    /// Trims every field and turns blank optional fields into `None`.
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: non_blank(self.phone),
            resume_url: non_blank(self.resume_url),
            job_role: self.job_role.trim().to_string(),
            job_id: non_blank(self.job_id),
        }
    }

    pub fn snapshot(&self) -> CandidateSnapshot {
        CandidateSnapshot {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: ApplicationStatus,
    #[serde(default)]
    #[validate(url(message = "Invalid offer letter URL"))]
    pub offer_letter_url: Option<String>,
}

impl UpdateStatusPayload {
    pub fn normalized(self) -> Self {
        Self {
            status: self.status,
            offer_letter_url: non_blank(self.offer_letter_url),
        }
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub candidate_id: String,
    pub job_id: String,
    pub job_role: String,
    pub submission_date: DateTime<Utc>,
    pub status: ApplicationStatus,
    /// Submitted form values, decoded for display.
    #[schema(value_type = Object)]
    pub answers: JsonValue,
    pub candidate: CandidateSnapshot,
    pub offer_letter_url: Option<String>,
}

impl From<Application> for ApplicationResponse {
    fn from(value: Application) -> Self {
        let answers = serde_json::from_str(&value.answers)
            .unwrap_or_else(|_| JsonValue::String(value.answers.clone()));
        Self {
            id: value.id,
            candidate_id: value.candidate_id,
            job_id: value.job_id,
            job_role: value.job_role,
            submission_date: value.submission_date,
            status: value.status,
            answers,
            candidate: value.candidate,
            offer_letter_url: value.offer_letter_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationListResponse {
    pub items: Vec<ApplicationResponse>,
    pub total: usize,
}

impl From<Vec<Application>> for ApplicationListResponse {
    fn from(value: Vec<Application>) -> Self {
        Self {
            total: value.len(),
            items: value.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitApplicationResponse {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub notice: Notice,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusUpdateResponse {
    pub application: ApplicationResponse,
    pub notice: Notice,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletionResponse {
    pub id: Uuid,
    pub notice: Notice,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct SessionRoleQuery {
    /// Portal the caller signed in through.
    pub portal: Portal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionRoleResponse {
    pub uid: String,
    pub role: RoleState,
    pub is_hr: bool,
    pub landing: Landing,
    pub landing_path: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusDictionaryEntry {
    pub value: ApplicationStatus,
    pub label: String,
    pub badge_variant: String,
}

impl From<ApplicationStatus> for StatusDictionaryEntry {
    fn from(value: ApplicationStatus) -> Self {
        Self {
            value,
            label: value.as_str().to_string(),
            badge_variant: value.badge_variant().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> SubmitApplicationPayload {
        SubmitApplicationPayload {
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: Some("   ".into()),
            resume_url: Some("".into()),
            job_role: "Backend Developer".into(),
            job_id: None,
        }
    }

    #[test]
    fn blank_optionals_are_dropped_before_validation() {
        let normalized = payload().normalized();
        assert_eq!(normalized.first_name, "Ada");
        assert_eq!(normalized.phone, None);
        assert_eq!(normalized.resume_url, None);
        assert!(normalized.validate().is_ok());
    }

    #[test]
    fn malformed_fields_fail_validation() {
        let mut bad = payload();
        bad.email = "not-an-email".into();
        bad.resume_url = Some("resume.pdf".into());
        bad.job_role = "  ".into();
        let errors = bad.normalized().validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("resume_url"));
        assert!(fields.contains_key("job_role"));
    }

    #[test]
    fn answers_are_decoded_for_display() {
        let app = Application {
            id: Uuid::new_v4(),
            candidate_id: "uid".into(),
            job_id: "default-job-id".into(),
            job_role: "Backend Developer".into(),
            submission_date: Utc::now(),
            status: ApplicationStatus::Applied,
            answers: r#"{"phone":"555"}"#.into(),
            candidate: payload().normalized().snapshot(),
            offer_letter_url: None,
        };
        let response = ApplicationResponse::from(app);
        assert_eq!(response.answers["phone"], "555");
    }
}
