use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) => "unauthenticated",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::ValidationFailed(_) | Error::Validation(_) | Error::Json(_) => {
                "validation_failed"
            }
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::Config(_) | Error::Internal(_) | Error::Database(_) => "internal",
        }
    }

    /// Whether retrying the same store call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ValidationFailed(_) | Error::Validation(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) | Error::Internal(_) | Error::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            Error::Unauthenticated(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::ValidationFailed(msg)
            | Error::StoreUnavailable(msg) => msg.clone(),
            Error::Validation(err) => err.to_string(),
            Error::Json(err) => err.to_string(),
            Error::Database(err) => {
                tracing::error!(error = %err, "database error reached the response layer");
                "An unexpected error occurred".to_string()
            }
            Error::Config(_) | Error::Internal(_) => {
                tracing::error!(error = %self, "internal error");
                "An unexpected error occurred".to_string()
            }
        };

        let body = Json(json!({ "error": self.code(), "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Error::StoreUnavailable(err.to_string())
            }
            sqlx::Error::Database(db) => {
                let code = db.code().map(|code| code.into_owned());
                match classify_sqlstate(code.as_deref()) {
                    SqlState::Rejected => Error::ValidationFailed(db.message().to_string()),
                    SqlState::Retryable => Error::StoreUnavailable(db.message().to_string()),
                    SqlState::Other => Error::Database(sqlx::Error::Database(db)),
                }
            }
            other => Error::Database(other),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SqlState {
    /// The statement itself was refused: constraint, bad data or a trigger.
    Rejected,
    /// The server could not run the statement right now.
    Retryable,
    Other,
}

fn classify_sqlstate(code: Option<&str>) -> SqlState {
    let Some(code) = code else {
        return SqlState::Other;
    };
    match code {
        "P0001" => SqlState::Rejected,
        "40001" | "40P01" => SqlState::Retryable,
        _ if code.starts_with("23") || code.starts_with("22") => SqlState::Rejected,
        _ if code.starts_with("08") || code.starts_with("53") || code.starts_with("57P") => {
            SqlState::Retryable
        }
        _ => SqlState::Other,
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::ValidationFailed(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::ValidationFailed(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::ValidationFailed(rejection.body_text())
    }
}
