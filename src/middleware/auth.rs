use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::identity::Identity;
use crate::services::role_resolver::Caller;
use crate::utils::token::decode_identity_token;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
            phone_number: claims.phone_number,
        }
    }
}

fn unauthenticated(message: &str) -> Response {
    Error::Unauthenticated(message.to_string()).into_response()
}

pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(AUTHORIZATION) else {
        return unauthenticated("You must be logged in to perform this action.");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthenticated("Malformed authorization header.");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthenticated("Unsupported authorization scheme.");
    };

    match decode_identity_token(token.trim(), &state.jwt_secret) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Builds the per-request caller from the identity placed by
/// [`require_bearer_auth`]; requests that skipped it are anonymous.
#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Identity>() {
            Some(identity) => Caller::authenticated(identity.clone()),
            None => Caller::anonymous(),
        })
    }
}
