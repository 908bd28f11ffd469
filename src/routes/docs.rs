use axum::response::{IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto::application_dto::{
    ApplicationListResponse, ApplicationResponse, DeletionResponse, SessionRoleResponse,
    StatusDictionaryEntry, StatusUpdateResponse, SubmitApplicationPayload,
    SubmitApplicationResponse, UpdateStatusPayload,
};
use crate::models::application::{ApplicationStatus, CandidateSnapshot};
use crate::services::notice::{Notice, NoticeVariant};
use crate::services::role_resolver::{Landing, Portal, RoleState};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::health::health,
        super::session::resolve_role,
        super::applications::submit_application,
        super::applications::list_own_applications,
        super::applications::stream_own_applications,
        super::applications::get_application,
        super::applications::withdraw_application,
        super::hr::list_all_applications,
        super::hr::stream_all_applications,
        super::hr::update_application_status,
        super::hr::remove_application,
        super::dictionaries::list_application_statuses,
        super::dictionaries::list_job_roles,
    ),
    components(schemas(
        ApplicationStatus,
        CandidateSnapshot,
        SubmitApplicationPayload,
        UpdateStatusPayload,
        ApplicationResponse,
        ApplicationListResponse,
        SubmitApplicationResponse,
        StatusUpdateResponse,
        DeletionResponse,
        SessionRoleResponse,
        StatusDictionaryEntry,
        Notice,
        NoticeVariant,
        RoleState,
        Landing,
        Portal,
    )),
    modifiers(&BearerAuth),
    tags((name = "applications", description = "Recruitment application workflow"))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[axum::debug_handler]
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
