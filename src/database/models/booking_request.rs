use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{ColumnValue, Entity, OwnedEntity, TemporalColumn};
use crate::tenant::TenantId;

/// Booking submitted against a fixed departure, usually from a public site
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingRequest {
    #[serde(default, skip_deserializing)]
    pub id: i64,
    #[serde(default, skip_deserializing)]
    pub user_id: i64,
    pub departure_date: String,
    pub sharing_option: String,
    pub price_per_person: i64,
    #[serde(default = "one")]
    pub adults: i64,
    #[serde(default)]
    pub children: i64,
    pub estimated_total_price: i64,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default, skip_deserializing)]
    pub is_deleted: bool,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn one() -> i64 {
    1
}

impl Entity for BookingRequest {
    const TABLE: &'static str = "booking_requests";
    const LABEL: &'static str = "Booking request";
    const SOFT_DELETE: bool = true;
    const TOUCHES_UPDATED_AT: bool = true;

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[("created_at", TemporalColumn::Timestamp), ("updated_at", TemporalColumn::Timestamp)]
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("user_id", self.user_id.into()),
            ("departure_date", self.departure_date.clone().into()),
            ("sharing_option", self.sharing_option.clone().into()),
            ("price_per_person", self.price_per_person.into()),
            ("adults", self.adults.into()),
            ("children", self.children.into()),
            ("estimated_total_price", self.estimated_total_price.into()),
            ("full_name", self.full_name.clone().into()),
            ("email", self.email.clone().into()),
            ("phone_number", self.phone_number.clone().into()),
            ("domain_name", self.domain_name.clone().into()),
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

impl OwnedEntity for BookingRequest {
    fn owner_id(&self) -> Option<TenantId> {
        TenantId::from_raw(self.user_id)
    }

    fn set_owner_id(&mut self, tenant: TenantId) {
        self.user_id = tenant.get();
    }
}
