pub mod context;

use serde::{Deserialize, Serialize};

pub use context::{SlotGuard, TenantSlot};

/// Identifier of the account that owns tenant-scoped rows.
///
/// Stored in the `user_id` column of owned tables. Zero is reserved as the
/// "unset" sentinel and never produces a `TenantId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// Wrap a raw owner value, treating `0` as unset
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Wrap an optional column value (`NULL` or `0` are both unset)
    pub fn from_column(raw: Option<i64>) -> Option<Self> {
        raw.and_then(Self::from_raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
