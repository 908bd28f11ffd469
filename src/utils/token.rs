use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::identity::Identity;
use crate::utils::time;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Mints an HS256 identity token. Real tokens come from the identity service;
/// this exists for tests and local tooling.
pub fn issue_identity_token(identity: &Identity, secret: &str, ttl: chrono::Duration) -> Result<String> {
    let claims = Claims {
        sub: identity.uid.clone(),
        exp: time::expires_in(ttl),
        email: identity.email.clone(),
        name: identity.display_name.clone(),
        phone_number: identity.phone_number.clone(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
}

pub fn decode_identity_token(token: &str, secret: &str) -> Result<Identity> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            Error::Unauthenticated("Invalid or expired session.".to_string())
        })?;
    if data.claims.sub.trim().is_empty() {
        return Err(Error::Unauthenticated("Token has no subject.".to_string()));
    }
    Ok(data.claims.into())
}
