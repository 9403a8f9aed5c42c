use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored administrator record. Never returned over the API as-is because
/// it carries the password hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_main_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}
