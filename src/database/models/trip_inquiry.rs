use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{ColumnValue, Entity, OwnedEntity, TemporalColumn};
use crate::tenant::TenantId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TripInquiry {
    #[serde(default, skip_deserializing)]
    pub id: i64,
    #[serde(default, skip_deserializing)]
    pub user_id: i64,
    pub departure_date: String,
    #[serde(default = "one")]
    pub adults: i64,
    #[serde(default)]
    pub children: i64,
    /// Comma separated, e.g. "4,7"
    #[serde(default)]
    pub children_ages: Option<String>,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn one() -> i64 {
    1
}

impl Entity for TripInquiry {
    const TABLE: &'static str = "trip_inquiries";
    const LABEL: &'static str = "Trip inquiry";
    const TOUCHES_UPDATED_AT: bool = true;

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[("created_at", TemporalColumn::Timestamp), ("updated_at", TemporalColumn::Timestamp)]
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("user_id", self.user_id.into()),
            ("departure_date", self.departure_date.clone().into()),
            ("adults", self.adults.into()),
            ("children", self.children.into()),
            ("children_ages", self.children_ages.clone().into()),
            ("full_name", self.full_name.clone().into()),
            ("email", self.email.clone().into()),
            ("phone_number", self.phone_number.clone().into()),
        ]
    }

    fn owner_column() -> Option<&'static str> {
        Some("user_id")
    }

    fn as_owned_mut(&mut self) -> Option<&mut dyn OwnedEntity> {
        Some(self)
    }
}

impl OwnedEntity for TripInquiry {
    fn owner_id(&self) -> Option<TenantId> {
        TenantId::from_raw(self.user_id)
    }

    fn set_owner_id(&mut self, tenant: TenantId) {
        self.user_id = tenant.get();
    }
}
