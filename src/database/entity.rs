//! Persisted row types and the ownership capability.
//!
//! Every table the API touches implements [`Entity`]. Tables whose rows
//! belong to a single account additionally implement [`OwnedEntity`] and
//! report their owner column through [`Entity::owner_column`]; the session
//! uses that to stamp inserts and scope queries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::{postgres::PgRow, FromRow, Postgres};

use crate::tenant::TenantId;

/// A typed value for one column of an INSERT or UPDATE
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Bool(bool),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    Json(Option<Value>),
}

impl ColumnValue {
    pub(crate) fn push_bind(self, qb: &mut sqlx::QueryBuilder<'_, Postgres>) {
        match self {
            ColumnValue::Int(v) => qb.push_bind(v),
            ColumnValue::Float(v) => qb.push_bind(v),
            ColumnValue::Text(v) => qb.push_bind(v),
            ColumnValue::Bool(v) => qb.push_bind(v),
            ColumnValue::Date(v) => qb.push_bind(v),
            ColumnValue::Timestamp(v) => qb.push_bind(v),
            ColumnValue::Json(v) => qb.push_bind(v),
        };
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int(Some(v))
    }
}

impl From<Option<i64>> for ColumnValue {
    fn from(v: Option<i64>) -> Self {
        ColumnValue::Int(v)
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::Text(Some(v))
    }
}

impl From<Option<String>> for ColumnValue {
    fn from(v: Option<String>) -> Self {
        ColumnValue::Text(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<Option<NaiveDate>> for ColumnValue {
    fn from(v: Option<NaiveDate>) -> Self {
        ColumnValue::Date(v)
    }
}

impl From<Option<f64>> for ColumnValue {
    fn from(v: Option<f64>) -> Self {
        ColumnValue::Float(v)
    }
}

impl From<Option<Value>> for ColumnValue {
    fn from(v: Option<Value>) -> Self {
        ColumnValue::Json(v)
    }
}

/// Date and time column types. Filter values for these arrive as JSON
/// strings and are cast on the SQL side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalColumn {
    Date,
    Timestamp,
}

impl TemporalColumn {
    pub fn sql_type(self) -> &'static str {
        match self {
            TemporalColumn::Date => "date",
            TemporalColumn::Timestamp => "timestamptz",
        }
    }
}

/// Ownership inherited from a parent row through a foreign key.
///
/// A row is visible to a tenant only while its parent is: the parent is
/// owned by that tenant and, if the parent table soft-deletes, not in the
/// trash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentOwner {
    /// Column on the child holding the parent's primary key
    pub link_column: &'static str,
    pub table: &'static str,
    pub label: &'static str,
    pub owner_column: &'static str,
    pub soft_delete: bool,
}

impl ParentOwner {
    /// `None` when `P` has no owner column of its own
    pub fn through<P: Entity>(link_column: &'static str) -> Option<Self> {
        Some(Self {
            link_column,
            table: P::TABLE,
            label: P::LABEL,
            owner_column: P::owner_column()?,
            soft_delete: P::SOFT_DELETE,
        })
    }
}

/// A row type backed by one table.
///
/// `columns` lists the writable columns in a stable order. Server-assigned
/// columns (`id`, `created_at`, `updated_at`) are left out.
pub trait Entity:
    for<'r> FromRow<'r, PgRow> + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    /// Human readable singular name used in messages
    const LABEL: &'static str;
    /// Table carries an `is_deleted` flag
    const SOFT_DELETE: bool = false;
    /// Table has an `updated_at` column refreshed on every UPDATE
    const TOUCHES_UPDATED_AT: bool = false;

    fn columns(&self) -> Vec<(&'static str, ColumnValue)>;

    /// Column holding the owning tenant, if rows are tenant-scoped
    fn owner_column() -> Option<&'static str> {
        None
    }

    /// Rows owned through a parent instead of an owner column
    fn parent_owner() -> Option<ParentOwner> {
        None
    }

    fn temporal_columns() -> &'static [(&'static str, TemporalColumn)] {
        &[]
    }

    fn as_owned_mut(&mut self) -> Option<&mut dyn OwnedEntity> {
        None
    }
}

/// Rows that belong to a tenant
pub trait OwnedEntity {
    /// Current owner; `None` when the column is NULL or 0
    fn owner_id(&self) -> Option<TenantId>;

    fn set_owner_id(&mut self, tenant: TenantId);
}

pub const SOFT_DELETE_COLUMN: &str = "is_deleted";
pub const PRIMARY_KEY: &str = "id";
