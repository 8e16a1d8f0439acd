use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{ColumnValue, Entity, TemporalColumn};

/// Trip category shared by every tenant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    #[serde(default, skip_deserializing)]
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Category {
    const TABLE: &'static str = "categories";
    const LABEL: &'static str = "Category";
    const TOUCHES_UPDATED_AT: bool = true;

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[("created_at", TemporalColumn::Timestamp), ("updated_at", TemporalColumn::Timestamp)]
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("name", self.name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("description", self.description.clone().into()),
            ("image", self.image.clone().into()),
        ]
    }
}
