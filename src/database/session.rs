//! Ownership-aware persistence session.
//!
//! A [`TenantSession`] wraps the pool for one request or unit of work. On
//! every operation it resolves the tenant (pinned at construction, else the
//! request's [`TenantSlot`], else none) and:
//!
//! * stamps the owner column of new rows when it is unset,
//! * prepends `owner = tenant` to single-entity reads, updates and deletes,
//!   or for rows owned through a parent, restricts them to the tenant's
//!   live parents.
//!
//! With no tenant resolved every operation passes through untouched. Join
//! queries are never scoped.

use serde_json::{json, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};

use crate::database::entity::{ColumnValue, Entity, ParentOwner, PRIMARY_KEY, SOFT_DELETE_COLUMN};
use crate::database::manager::DatabaseError;
use crate::database::query_builder::{EntityQuery, JoinQuery};
use crate::database::registry::TableInfo;
use crate::filter::{is_identifier, quote_identifier, Filter, FilterError};
use crate::tenant::{TenantId, TenantSlot};

/// Restricts a table to one tenant's rows: `owner_column = tenant`, or for
/// tables owned through a parent, `link IN (visible parent ids)`. Every
/// name is validated before the predicate is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerPredicate {
    column: String,
    tenant: TenantId,
    parent: Option<ParentOwner>,
}

impl OwnerPredicate {
    /// Owner column, or the link column for rows owned through a parent
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Scope `filter`. A direct owner becomes the first where-fragment; an
    /// inherited one becomes a bound fixed condition.
    pub(crate) fn apply(&self, filter: &mut Filter) -> Result<(), FilterError> {
        match self.parent {
            None => {
                filter.where_clause(json!({ self.column.as_str(): self.tenant.get() }))?;
            }
            Some(_) => {
                filter.bound_condition(self.template(), json!(self.tenant.get()));
            }
        }
        Ok(())
    }

    /// SQL with `$?` where the tenant is bound
    fn template(&self) -> String {
        match &self.parent {
            None => format!("\"{}\" = $?", self.column),
            Some(parent) => {
                let live = if parent.soft_delete {
                    format!(" AND \"{}\" = false", SOFT_DELETE_COLUMN)
                } else {
                    String::new()
                };
                format!(
                    "\"{}\" IN (SELECT \"{}\" FROM \"{}\" WHERE \"{}\" = $?{})",
                    parent.link_column, PRIMARY_KEY, parent.table, parent.owner_column, live
                )
            }
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let template = self.template();
        let (head, tail) = template.split_once("$?").unwrap_or((template.as_str(), ""));
        qb.push(" AND ");
        qb.push(head);
        qb.push_bind(self.tenant.get());
        qb.push(tail);
    }
}

/// Tenant resolution and ownership rules, independent of any connection
#[derive(Debug, Clone, Copy)]
pub struct OwnershipScope {
    pinned: Option<TenantId>,
    strict: bool,
}

impl OwnershipScope {
    /// Follow the request's tenant slot
    pub fn ambient() -> Self {
        Self {
            pinned: None,
            strict: crate::config::config().tenancy.strict_scoping,
        }
    }

    /// Always act for `tenant`, whatever the slot holds
    pub fn pinned(tenant: TenantId) -> Self {
        Self {
            pinned: Some(tenant),
            ..Self::ambient()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn tenant(&self) -> Option<TenantId> {
        self.pinned.or_else(TenantSlot::current)
    }

    /// Set the owner on a new row if a tenant is resolved and the row has none.
    ///
    /// Returns the owner the row ends up with.
    pub fn stamp<E: Entity>(&self, entity: &mut E) -> Option<TenantId> {
        let tenant = self.tenant();
        let owned = entity.as_owned_mut()?;
        match (owned.owner_id(), tenant) {
            (Some(existing), _) => Some(existing),
            (None, Some(tenant)) => {
                owned.set_owner_id(tenant);
                debug!(table = E::TABLE, %tenant, "stamped owner on insert");
                Some(tenant)
            }
            (None, None) => None,
        }
    }

    /// Predicate restricting `table` to the resolved tenant.
    ///
    /// `Ok(None)` when the table is unowned or no tenant is resolved. A name
    /// that is not a plain identifier skips scoping with a warning, or fails
    /// when strict scoping is on.
    pub fn owner_predicate(&self, table: &TableInfo) -> Result<Option<OwnerPredicate>, DatabaseError> {
        let Some(tenant) = self.tenant() else {
            return Ok(None);
        };
        let (column, parent) = match (table.owner_column, table.parent_owner) {
            (Some(column), _) => (column, None),
            (None, Some(parent)) => (parent.link_column, Some(parent)),
            (None, None) => return Ok(None),
        };

        let names_ok = is_identifier(column)
            && parent.map_or(true, |p| is_identifier(p.table) && is_identifier(p.owner_column));
        if !names_ok {
            if self.strict {
                return Err(DatabaseError::Scoping(format!(
                    "owner column {:?} on {} is not a valid identifier",
                    column, table.name
                )));
            }
            warn!(table = table.name, column, %tenant, "cannot scope by owner column; running unscoped");
            return Ok(None);
        }
        debug!(table = table.name, column, %tenant, "scoping query to tenant");
        Ok(Some(OwnerPredicate {
            column: column.to_string(),
            tenant,
            parent,
        }))
    }
}

/// Per-request handle on the database that applies tenant ownership rules
#[derive(Debug, Clone)]
pub struct TenantSession {
    pool: PgPool,
    scope: OwnershipScope,
}

impl TenantSession {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scope: OwnershipScope::ambient(),
        }
    }

    pub fn pinned(pool: PgPool, tenant: TenantId) -> Self {
        Self {
            pool,
            scope: OwnershipScope::pinned(tenant),
        }
    }

    pub fn tenant(&self) -> Option<TenantId> {
        self.scope.tenant()
    }

    /// Insert a new row, stamping its owner first. Rows owned through a
    /// parent may only point at a parent the tenant can see.
    pub async fn add<E: Entity>(&self, mut entity: E) -> Result<E, DatabaseError> {
        self.scope.stamp(&mut entity);
        self.ensure_parent_visible(&entity).await?;
        let mut qb = Self::insert_sql(&entity)?;
        let row = qb.build_query_as::<E>().fetch_one(&self.pool).await?;
        Ok(row)
    }

    pub fn query<E: Entity>(&self) -> Result<EntityQuery<E>, DatabaseError> {
        let owner = self.scope.owner_predicate(&TableInfo::of::<E>())?;
        EntityQuery::new(self.pool.clone(), owner)
    }

    /// Multi-table query rooted at `B`; never scoped
    pub fn query_join<B: Entity>(&self) -> Result<JoinQuery, DatabaseError> {
        JoinQuery::new::<B>(self.pool.clone())
    }

    pub async fn find<E: Entity>(&self, id: i64) -> Result<Option<E>, DatabaseError> {
        self.query::<E>()?.filter(json!({ PRIMARY_KEY: id }))?.first().await
    }

    /// Replace a row's writable columns. The owner column is never written.
    ///
    /// `Ok(None)` when no visible row has this id.
    pub async fn update<E: Entity>(&self, id: i64, entity: &E) -> Result<Option<E>, DatabaseError> {
        self.ensure_parent_visible(entity).await?;
        let owner = self.scope.owner_predicate(&TableInfo::of::<E>())?;
        let mut qb = Self::update_sql(id, entity, owner.as_ref())?;
        let row = qb.build_query_as::<E>().fetch_optional(&self.pool).await?;
        Ok(row)
    }

    /// Hard delete a single visible row
    pub async fn delete<E: Entity>(&self, id: i64) -> Result<bool, DatabaseError> {
        self.hard_delete(&TableInfo::of::<E>(), id).await
    }

    pub async fn soft_delete(&self, table: &TableInfo, id: i64) -> Result<bool, DatabaseError> {
        self.set_deleted(table, id, true).await
    }

    pub async fn restore(&self, table: &TableInfo, id: i64) -> Result<bool, DatabaseError> {
        self.set_deleted(table, id, false).await
    }

    pub async fn hard_delete(&self, table: &TableInfo, id: i64) -> Result<bool, DatabaseError> {
        let owner = self.scope.owner_predicate(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {}", quote_identifier(table.name)?));
        Self::push_id_and_owner(&mut qb, id, owner.as_ref());
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-deleted rows of a table, newest first
    pub async fn trash(&self, table: &TableInfo) -> Result<Vec<Value>, DatabaseError> {
        let owner = self.scope.owner_predicate(table)?;
        let mut qb = Self::trash_sql(table, owner.as_ref())?;
        let rows: Vec<(Value,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(row,)| row).collect())
    }

    async fn set_deleted(&self, table: &TableInfo, id: i64, deleted: bool) -> Result<bool, DatabaseError> {
        let owner = self.scope.owner_predicate(table)?;
        let mut qb = Self::set_deleted_sql(table, id, deleted, owner.as_ref())?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fails with `NotFound` when a tenant is resolved and the row's parent
    /// is not one of its live rows
    async fn ensure_parent_visible<E: Entity>(&self, entity: &E) -> Result<(), DatabaseError> {
        let Some(parent) = E::parent_owner() else {
            return Ok(());
        };
        let Some(tenant) = self.tenant() else {
            return Ok(());
        };
        let link = entity.columns().into_iter().find(|(name, _)| *name == parent.link_column);
        let Some((_, ColumnValue::Int(Some(parent_id)))) = link else {
            return Err(DatabaseError::QueryError(format!(
                "{} has no {} value",
                E::LABEL,
                parent.link_column
            )));
        };

        let mut qb = Self::parent_visible_sql(&parent, parent_id, tenant)?;
        let (visible,): (bool,) = qb.build_query_as().fetch_one(&self.pool).await?;
        if visible {
            Ok(())
        } else {
            debug!(table = E::TABLE, parent = parent.table, parent_id, %tenant, "parent row not visible");
            Err(DatabaseError::NotFound(format!("{} not found.", parent.label)))
        }
    }

    fn parent_visible_sql(
        parent: &ParentOwner,
        parent_id: i64,
        tenant: TenantId,
    ) -> Result<QueryBuilder<'static, Postgres>, DatabaseError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE \"{}\" = ",
            quote_identifier(parent.table)?,
            PRIMARY_KEY
        ));
        qb.push_bind(parent_id);
        qb.push(format!(" AND {} = ", quote_identifier(parent.owner_column)?));
        qb.push_bind(tenant.get());
        if parent.soft_delete {
            qb.push(format!(" AND \"{}\" = false", SOFT_DELETE_COLUMN));
        }
        qb.push(")");
        Ok(qb)
    }

    fn insert_sql<E: Entity>(entity: &E) -> Result<QueryBuilder<'static, Postgres>, DatabaseError> {
        let columns = entity.columns();
        let names = columns
            .iter()
            .map(|(name, _)| quote_identifier(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut qb = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            quote_identifier(E::TABLE)?,
            names.join(", ")
        ));
        for (i, (_, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            value.push_bind(&mut qb);
        }
        qb.push(") RETURNING *");
        Ok(qb)
    }

    fn update_sql<E: Entity>(
        id: i64,
        entity: &E,
        owner: Option<&OwnerPredicate>,
    ) -> Result<QueryBuilder<'static, Postgres>, DatabaseError> {
        let owner_column = E::owner_column();
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", quote_identifier(E::TABLE)?));
        let mut first = true;
        for (name, value) in entity.columns() {
            if Some(name) == owner_column || name == SOFT_DELETE_COLUMN {
                continue;
            }
            if !first {
                qb.push(", ");
            }
            first = false;
            qb.push(format!("{} = ", quote_identifier(name)?));
            value.push_bind(&mut qb);
        }
        if E::TOUCHES_UPDATED_AT {
            if !first {
                qb.push(", ");
            }
            first = false;
            qb.push("\"updated_at\" = now()");
        }
        if first {
            return Err(DatabaseError::QueryError(format!("{} has no updatable columns", E::LABEL)));
        }
        Self::push_id_and_owner(&mut qb, id, owner);
        if E::SOFT_DELETE {
            qb.push(format!(" AND \"{}\" = false", SOFT_DELETE_COLUMN));
        }
        qb.push(" RETURNING *");
        Ok(qb)
    }

    fn set_deleted_sql(
        table: &TableInfo,
        id: i64,
        deleted: bool,
        owner: Option<&OwnerPredicate>,
    ) -> Result<QueryBuilder<'static, Postgres>, DatabaseError> {
        table.require_soft_delete()?;
        let mut qb = QueryBuilder::new(format!(
            "UPDATE {} SET \"{}\" = {}",
            quote_identifier(table.name)?,
            SOFT_DELETE_COLUMN,
            deleted
        ));
        Self::push_id_and_owner(&mut qb, id, owner);
        qb.push(format!(" AND \"{}\" = {}", SOFT_DELETE_COLUMN, !deleted));
        Ok(qb)
    }

    fn trash_sql(
        table: &TableInfo,
        owner: Option<&OwnerPredicate>,
    ) -> Result<QueryBuilder<'static, Postgres>, DatabaseError> {
        table.require_soft_delete()?;
        let quoted = quote_identifier(table.name)?;
        let mut qb = QueryBuilder::new(format!(
            "SELECT to_jsonb({q}) FROM {q} WHERE \"{}\" = true",
            SOFT_DELETE_COLUMN,
            q = quoted
        ));
        if let Some(owner) = owner {
            owner.push_sql(&mut qb);
        }
        qb.push(format!(" ORDER BY \"{}\" DESC", PRIMARY_KEY));
        Ok(qb)
    }

    fn push_id_and_owner(qb: &mut QueryBuilder<'_, Postgres>, id: i64, owner: Option<&OwnerPredicate>) {
        qb.push(format!(" WHERE \"{}\" = ", PRIMARY_KEY));
        qb.push_bind(id);
        if let Some(owner) = owner {
            owner.push_sql(qb);
        }
    }
}
