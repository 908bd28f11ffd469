use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::{
    dto::application_dto::{
        ApplicationListResponse, ApplicationResponse, DeletionResponse, SubmitApplicationPayload,
        SubmitApplicationResponse,
    },
    error::Result,
    routes::extract::{AppJson, AppPath},
    models::application::Application,
    services::{
        application_workflow::Scope,
        notice::{Action, Notice},
        role_resolver::Caller,
    },
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = SubmitApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = SubmitApplicationResponse),
        (status = 400, description = "Invalid form"),
        (status = 401, description = "Not signed in"),
        (status = 503, description = "Store unavailable")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    caller: Caller,
    AppJson(payload): AppJson<SubmitApplicationPayload>,
) -> Result<impl IntoResponse> {
    let application = state.workflow.submit(&caller, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            id: application.id,
            status: application.status,
            notice: Notice::submitted(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/applications/mine",
    responses(
        (status = 200, description = "The caller's applications, newest first", body = ApplicationListResponse),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_own_applications(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse> {
    let items = state.workflow.list_own(&caller).await?;
    Ok(Json(ApplicationListResponse::from(items)))
}

/// Server-sent events: a `snapshot` event up front and after every change.
#[utoipa::path(
    get,
    path = "/api/applications/mine/stream",
    responses(
        (status = 200, description = "Event stream of ApplicationListResponse snapshots"),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn stream_own_applications(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let live = state.workflow.subscribe(&caller, Scope::Own).await?;
    Ok(Sse::new(live.map(snapshot_event)).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application details", body = ApplicationResponse),
        (status = 403, description = "Neither the owner nor HR"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    caller: Caller,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.workflow.get(&caller, id).await?;
    Ok(Json(ApplicationResponse::from(application)))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application withdrawn", body = DeletionResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn withdraw_application(
    State(state): State<AppState>,
    caller: Caller,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    state.workflow.withdraw(&caller, id).await?;
    Ok(Json(DeletionResponse {
        id,
        notice: Notice::withdrawn(),
    }))
}

/// Turns one live-view emission into an SSE event. A failed re-read becomes an
/// `error` event carrying the load-failure notice; the stream stays open.
pub(crate) fn snapshot_event(
    snapshot: Result<Vec<Application>>,
) -> std::result::Result<Event, Infallible> {
    let event = match snapshot {
        Ok(items) => Event::default()
            .event("snapshot")
            .json_data(ApplicationListResponse::from(items)),
        Err(e) => {
            tracing::warn!(error = %e, "live view read failed");
            Event::default()
                .event("error")
                .json_data(Notice::failure(Action::Load, &e))
        }
    };
    Ok(event.unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
}
