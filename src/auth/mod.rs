//! API key to tenant resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;

use crate::database::{service, DatabaseError};
use crate::tenant::TenantId;

/// Infrastructure failure while looking up a credential. An unknown key is
/// not an error; resolvers report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Maps a raw API key to the tenant it acts for
#[async_trait]
pub trait ApiKeyResolver: Send + Sync {
    async fn resolve(&self, api_key: &str) -> Result<Option<TenantId>, ResolveError>;
}

/// Looks keys up in the `api_keys` table
#[derive(Debug, Clone)]
pub struct PgApiKeyResolver {
    pool: PgPool,
}

impl PgApiKeyResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyResolver for PgApiKeyResolver {
    async fn resolve(&self, api_key: &str) -> Result<Option<TenantId>, ResolveError> {
        let key = service::find_active_api_key(&self.pool, api_key).await?;
        Ok(key.and_then(|k| TenantId::from_raw(k.user_id)))
    }
}

/// Fixed key table, for tests and local tooling
#[derive(Debug, Clone, Default)]
pub struct StaticApiKeyResolver {
    keys: HashMap<String, TenantId>,
}

impl StaticApiKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, api_key: impl Into<String>, tenant: TenantId) -> Self {
        self.keys.insert(api_key.into(), tenant);
        self
    }
}

#[async_trait]
impl ApiKeyResolver for StaticApiKeyResolver {
    async fn resolve(&self, api_key: &str) -> Result<Option<TenantId>, ResolveError> {
        Ok(self.keys.get(api_key).copied())
    }
}

/// Short, stable identifier for a key that is safe to log
pub fn key_fingerprint(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}

/// A fresh random key value
pub fn generate_api_key() -> String {
    format!("crm_{}", uuid::Uuid::new_v4().simple())
}
