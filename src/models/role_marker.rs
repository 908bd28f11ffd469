use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Namespace the HR role markers live under.
pub const HR_ROLE_NAMESPACE: &str = "roles_hr";

/// Presence-only marker. Its existence grants HR privileges; the content is never inspected.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HrRoleMarker {
    pub uid: String,
    pub created_at: Option<DateTime<Utc>>,
}
