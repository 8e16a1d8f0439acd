//! Account lookups that sit outside tenant scoping.

use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{ApiKey, User};
use crate::tenant::TenantId;

/// Owner of the public site served at `domain`
pub async fn find_owner_by_domain(pool: &PgPool, domain: &str) -> Result<Option<TenantId>, DatabaseError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Ok(None);
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, website, created_at
         FROM users
         WHERE lower(website) = lower($1)
         ORDER BY id
         LIMIT 1",
    )
    .bind(domain)
    .fetch_optional(pool)
    .await?;

    Ok(user.and_then(|u| TenantId::from_raw(u.id)))
}

pub async fn find_user(pool: &PgPool, user_id: i64) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, website, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Active key matching `key_value`, if any
pub async fn find_active_api_key(pool: &PgPool, key_value: &str) -> Result<Option<ApiKey>, DatabaseError> {
    let key = sqlx::query_as::<_, ApiKey>(
        "SELECT id, key_value, label, user_id, is_active, created_at, revoked_at
         FROM api_keys
         WHERE key_value = $1 AND is_active AND revoked_at IS NULL",
    )
    .bind(key_value)
    .fetch_optional(pool)
    .await?;
    Ok(key)
}

pub async fn insert_api_key(
    pool: &PgPool,
    user_id: i64,
    key_value: &str,
    label: Option<&str>,
) -> Result<ApiKey, DatabaseError> {
    let key = sqlx::query_as::<_, ApiKey>(
        "INSERT INTO api_keys (key_value, label, user_id)
         VALUES ($1, $2, $3)
         RETURNING id, key_value, label, user_id, is_active, created_at, revoked_at",
    )
    .bind(key_value)
    .bind(label)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(key)
}

/// Deactivate a key. Returns false when it was unknown or already revoked.
pub async fn revoke_api_key(pool: &PgPool, key_value: &str) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE api_keys SET is_active = false, revoked_at = now()
         WHERE key_value = $1 AND revoked_at IS NULL",
    )
    .bind(key_value)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_api_keys(pool: &PgPool, user_id: i64) -> Result<Vec<ApiKey>, DatabaseError> {
    let keys = sqlx::query_as::<_, ApiKey>(
        "SELECT id, key_value, label, user_id, is_active, created_at, revoked_at
         FROM api_keys
         WHERE user_id = $1
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(keys)
}
