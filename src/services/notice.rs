use crate::error::Error;
use crate::models::application::{ApplicationStatus, CandidateSnapshot};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// User-visible confirmation or error for a workflow action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    UpdateStatus,
    Remove,
    Withdraw,
    Load,
}

impl Action {
    fn failure_text(self) -> &'static str {
        match self {
            Action::Submit => "Failed to submit application. Please try again.",
            Action::UpdateStatus => "Failed to update status. Please try again.",
            Action::Remove => "Failed to delete application. Please try again.",
            Action::Withdraw => "Failed to withdraw application. Please try again.",
            Action::Load => "Failed to load applications. Please try again.",
        }
    }

    fn login_text(self) -> &'static str {
        match self {
            Action::Submit => "You must be logged in to submit an application.",
            Action::UpdateStatus => "You must be logged in to update an application's status.",
            Action::Remove => "You must be logged in to delete an application.",
            Action::Withdraw => "You must be logged in to withdraw an application.",
            Action::Load => "You must be logged in to view applications.",
        }
    }
}

impl Notice {
    fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    fn destructive(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }

    pub fn submitted() -> Self {
        Self::success("Success", "Your application has been submitted.")
    }

    pub fn status_updated(candidate: &CandidateSnapshot, status: ApplicationStatus) -> Self {
        Self::success(
            "Status Updated",
            format!("Status for {} updated to {}.", candidate.full_name(), status),
        )
    }

    pub fn removed() -> Self {
        Self::success(
            "Application Deleted",
            "The application has been successfully deleted.",
        )
    }

    pub fn withdrawn() -> Self {
        Self::success(
            "Application Withdrawn",
            "Your application has been successfully withdrawn.",
        )
    }

    pub fn failure(action: Action, err: &Error) -> Self {
        match err {
            Error::Unauthenticated(_) => Self::destructive("Error", action.login_text()),
            Error::Forbidden(_) => Self::destructive(
                "Access Denied",
                "You do not have permission to perform this action.",
            ),
            Error::NotFound(_) => {
                Self::destructive("Not Found", "This application no longer exists.")
            }
            Error::ValidationFailed(msg) => Self::destructive("Invalid Input", msg.clone()),
            Error::Validation(errors) => Self::destructive("Invalid Input", errors.to_string()),
            _ => Self::destructive("Error", action.failure_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_notice_names_the_candidate() {
        let candidate = CandidateSnapshot {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
        };
        let notice = Notice::status_updated(&candidate, ApplicationStatus::Offered);
        assert_eq!(notice.title, "Status Updated");
        assert_eq!(notice.description, "Status for Ada Lovelace updated to Offered.");
        assert_eq!(notice.variant, NoticeVariant::Default);
    }

    #[test]
    fn every_error_kind_has_a_distinct_destructive_notice() {
        let notices = [
            Notice::failure(Action::Submit, &Error::Unauthenticated("x".into())),
            Notice::failure(Action::UpdateStatus, &Error::Forbidden("x".into())),
            Notice::failure(Action::Withdraw, &Error::NotFound("x".into())),
            Notice::failure(Action::Submit, &Error::ValidationFailed("bad email".into())),
            Notice::failure(Action::Remove, &Error::StoreUnavailable("x".into())),
        ];
        for (i, a) in notices.iter().enumerate() {
            assert_eq!(a.variant, NoticeVariant::Destructive);
            for b in notices.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn login_notice_names_the_attempted_action() {
        let logged_out = Error::Unauthenticated("no token".into());
        assert_eq!(
            Notice::failure(Action::Submit, &logged_out).description,
            "You must be logged in to submit an application."
        );
        assert_eq!(
            Notice::failure(Action::Withdraw, &logged_out).description,
            "You must be logged in to withdraw an application."
        );
        assert_eq!(
            Notice::failure(Action::Load, &logged_out).description,
            "You must be logged in to view applications."
        );
    }
}
