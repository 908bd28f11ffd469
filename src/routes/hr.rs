use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::{
    dto::application_dto::{
        ApplicationListResponse, DeletionResponse, StatusUpdateResponse, UpdateStatusPayload,
    },
    error::Result,
    routes::{
        applications::snapshot_event,
        extract::{AppJson, AppPath},
    },
    services::{application_workflow::Scope, notice::Notice, role_resolver::Caller},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/hr/applications",
    responses(
        (status = 200, description = "Every application, newest first", body = ApplicationListResponse),
        (status = 403, description = "Caller is not HR")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_all_applications(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse> {
    let items = state.workflow.list_all(&caller).await?;
    Ok(Json(ApplicationListResponse::from(items)))
}

#[utoipa::path(
    get,
    path = "/api/hr/applications/stream",
    responses(
        (status = 200, description = "Event stream of ApplicationListResponse snapshots"),
        (status = 403, description = "Caller is not HR")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn stream_all_applications(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let live = state.workflow.subscribe(&caller, Scope::All).await?;
    Ok(Sse::new(live.map(snapshot_event)).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    patch,
    path = "/api/hr/applications/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = StatusUpdateResponse),
        (status = 400, description = "Invalid status change"),
        (status = 403, description = "Caller is not HR"),
        (status = 404, description = "Application not found"),
        (status = 503, description = "Store unavailable")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    caller: Caller,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state.workflow.update_status(&caller, id, payload).await?;
    let notice = Notice::status_updated(&application.candidate, application.status);
    Ok(Json(StatusUpdateResponse {
        application: application.into(),
        notice,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/hr/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application deleted", body = DeletionResponse),
        (status = 403, description = "Caller is not HR"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn remove_application(
    State(state): State<AppState>,
    caller: Caller,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    state.workflow.remove(&caller, id).await?;
    Ok(Json(DeletionResponse {
        id,
        notice: Notice::removed(),
    }))
}
