use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Credential presented in the API key header.
///
/// `user_id` is the account whose rows the key can see; it becomes the
/// request's tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    pub id: i64,
    #[serde(skip_serializing)]
    pub key_value: String,
    pub label: Option<String>,
    pub user_id: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn is_usable(&self) -> bool {
        self.is_active && self.revoked_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_keys_are_not_usable() {
        let mut key = ApiKey {
            id: 1,
            key_value: "k".to_string(),
            label: None,
            user_id: 4,
            is_active: true,
            created_at: Utc::now(),
            revoked_at: None,
        };
        assert!(key.is_usable());
        key.revoked_at = Some(Utc::now());
        assert!(!key.is_usable());
    }

    #[test]
    fn key_value_is_never_serialized() {
        let key = ApiKey {
            id: 1,
            key_value: "secret".to_string(),
            label: Some("website".to_string()),
            user_id: 4,
            is_active: true,
            created_at: Utc::now(),
            revoked_at: None,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert!(json.get("key_value").is_none());
    }
}
