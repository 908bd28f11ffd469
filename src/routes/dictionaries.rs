use axum::response::{IntoResponse, Json};

use crate::{
    dto::application_dto::{StatusDictionaryEntry, STANDARD_JOB_ROLES},
    models::application::ApplicationStatus,
};

#[utoipa::path(
    get,
    path = "/api/dictionaries/application-statuses",
    responses(
        (status = 200, description = "Statuses in workflow order", body = [StatusDictionaryEntry])
    )
)]
#[axum::debug_handler]
pub async fn list_application_statuses() -> impl IntoResponse {
    let entries: Vec<StatusDictionaryEntry> = ApplicationStatus::ordered()
        .into_iter()
        .map(StatusDictionaryEntry::from)
        .collect();
    Json(entries)
}

#[utoipa::path(
    get,
    path = "/api/dictionaries/job-roles",
    responses((status = 200, description = "Roles offered by the submission form", body = [String]))
)]
#[axum::debug_handler]
pub async fn list_job_roles() -> impl IntoResponse {
    Json(STANDARD_JOB_ROLES)
}
