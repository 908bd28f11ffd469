pub mod applications;
pub mod dictionaries;
pub mod docs;
pub mod extract;
pub mod health;
pub mod hr;
pub mod session;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};

use crate::middleware::auth::require_bearer_auth;
use crate::AppState;

/// Every route of the service. Layers that depend on the deployment (CORS,
/// tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/api/session/role", get(session::resolve_role))
        .route("/api/applications", post(applications::submit_application))
        .route(
            "/api/applications/mine",
            get(applications::list_own_applications),
        )
        .route(
            "/api/applications/mine/stream",
            get(applications::stream_own_applications),
        )
        .route(
            "/api/applications/:id",
            get(applications::get_application).delete(applications::withdraw_application),
        )
        .route("/api/hr/applications", get(hr::list_all_applications))
        .route(
            "/api/hr/applications/stream",
            get(hr::stream_all_applications),
        )
        .route(
            "/api/hr/applications/:id/status",
            patch(hr::update_application_status),
        )
        .route("/api/hr/applications/:id", delete(hr::remove_application))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/dictionaries/application-statuses",
            get(dictionaries::list_application_statuses),
        )
        .route(
            "/api/dictionaries/job-roles",
            get(dictionaries::list_job_roles),
        )
        .route("/api/openapi.json", get(docs::openapi_json))
        .merge(authenticated)
        .with_state(state)
}
