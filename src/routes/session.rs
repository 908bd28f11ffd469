use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{
    dto::application_dto::{SessionRoleQuery, SessionRoleResponse},
    error::Result,
    routes::extract::AppQuery,
    services::role_resolver::{Caller, Landing},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/session/role",
    params(SessionRoleQuery),
    responses(
        (status = 200, description = "Resolved role and landing page", body = SessionRoleResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "HR portal requested without the HR role")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn resolve_role(
    State(state): State<AppState>,
    caller: Caller,
    AppQuery(query): AppQuery<SessionRoleQuery>,
) -> Result<impl IntoResponse> {
    let landing = state.workflow.roles().landing(&caller, query.portal).await?;
    let identity = caller.require_identity()?;
    Ok(Json(SessionRoleResponse {
        uid: identity.uid.clone(),
        role: caller.role_state(),
        is_hr: landing == Landing::HrConsole,
        landing,
        landing_path: landing.path().to_string(),
    }))
}
