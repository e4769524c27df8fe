use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A tag together with how many contacts currently reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TagUsage {
    pub id: Uuid,
    pub name: String,
    pub contact_count: i64,
    pub created_at: DateTime<Utc>,
}
