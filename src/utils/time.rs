use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Unix timestamp `ttl` from now, as carried in the `exp` claim.
pub fn expires_in(ttl: chrono::Duration) -> usize {
    (now() + ttl).timestamp().max(0) as usize
}
