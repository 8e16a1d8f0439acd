use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{ColumnValue, Entity, OwnedEntity, TemporalColumn};
use crate::tenant::TenantId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lead {
    #[serde(default, skip_deserializing)]
    pub id: i64,
    #[serde(default, skip_deserializing)]
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub destination_type: String,
    #[serde(default)]
    pub pickup: Option<String>,
    #[serde(default)]
    pub drop_location: Option<String>,
    #[serde(default)]
    pub travel_from: Option<NaiveDate>,
    #[serde(default)]
    pub travel_to: Option<NaiveDate>,
    #[serde(default)]
    pub adults: Option<i64>,
    #[serde(default)]
    pub children: Option<i64>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_deserializing)]
    pub is_deleted: bool,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "New".to_string()
}

fn default_priority() -> String {
    "Medium".to_string()
}

impl Entity for Lead {
    const TABLE: &'static str = "leads";
    const LABEL: &'static str = "Lead";
    const SOFT_DELETE: bool = true;

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[
            ("travel_from", TemporalColumn::Date),
            ("travel_to", TemporalColumn::Date),
            ("follow_up_date", TemporalColumn::Date),
            ("created_at", TemporalColumn::Timestamp),
        ]
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("user_id", self.user_id.into()),
            ("name", self.name.clone().into()),
            ("email", self.email.clone().into()),
            ("mobile", self.mobile.clone().into()),
            ("destination_type", self.destination_type.clone().into()),
            ("pickup", self.pickup.clone().into()),
            ("drop_location", self.drop_location.clone().into()),
            ("travel_from", self.travel_from.into()),
            ("travel_to", self.travel_to.into()),
            ("adults", self.adults.into()),
            ("children", self.children.into()),
            ("status", self.status.clone().into()),
            ("priority", self.priority.clone().into()),
            ("assigned_to", self.assigned_to.into()),
            ("follow_up_date", self.follow_up_date.into()),
            ("source", self.source.clone().into()),
            ("is_deleted", self.is_deleted.into()),
        ]
    }

    fn owner_column() -> Option<&'static str> {
        Some("user_id")
    }

    fn as_owned_mut(&mut self) -> Option<&mut dyn OwnedEntity> {
        Some(self)
    }
}

impl OwnedEntity for Lead {
    fn owner_id(&self) -> Option<TenantId> {
        TenantId::from_raw(self.user_id)
    }

    fn set_owner_id(&mut self, tenant: TenantId) {
        self.user_id = tenant.get();
    }
}
