use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{ColumnValue, Entity, ParentOwner, TemporalColumn};
use crate::database::models::Lead;

/// Priced proposal attached to a lead.
///
/// Quotations carry no owner column; a tenant sees the quotations of its
/// own live leads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quotation {
    #[serde(default, skip_deserializing)]
    pub id: i64,
    pub lead_id: i64,
    pub design: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

fn default_status() -> String {
    "Draft".to_string()
}

impl Entity for Quotation {
    const TABLE: &'static str = "quotations";
    const LABEL: &'static str = "Quotation";

    fn parent_owner() -> Option<ParentOwner> {
        ParentOwner::through::<Lead>("lead_id")
    }

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[("date", TemporalColumn::Date)]
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("lead_id", self.lead_id.into()),
            ("design", self.design.clone().into()),
            ("status", self.status.clone().into()),
            ("amount", self.amount.into()),
            ("date", self.date.into()),
        ]
    }
}
