use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Agency account. Its id is the tenant for every row it owns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Public domain served for this account, matched by public endpoints
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}
