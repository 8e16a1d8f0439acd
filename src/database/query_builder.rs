use std::marker::PhantomData;

use serde_json::{Map, Value};
use sqlx::{postgres::PgArguments, postgres::PgRow, FromRow, PgPool, Row};

use crate::database::entity::{Entity, SOFT_DELETE_COLUMN};
use crate::database::manager::DatabaseError;
use crate::database::session::OwnerPredicate;
use crate::filter::{quote_identifier, Filter, FilterData, SqlResult, TrashMode};

/// Single-entity query produced by a session.
///
/// When the session resolved a tenant, the owner predicate comes ahead of
/// every caller fragment, which is ANDed after it.
pub struct EntityQuery<E> {
    pool: PgPool,
    filter: Filter,
    trash: TrashMode,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityQuery<E> {
    pub(crate) fn new(pool: PgPool, owner: Option<OwnerPredicate>) -> Result<Self, DatabaseError> {
        let mut filter = Filter::new(E::TABLE)?;
        filter.limit(None, None)?;
        register_casts::<E>(&mut filter);
        if let Some(owner) = owner {
            owner.apply(&mut filter)?;
        }
        Ok(Self {
            pool,
            filter,
            trash: TrashMode::default(),
            _entity: PhantomData,
        })
    }

    pub fn filter(mut self, conditions: Value) -> Result<Self, DatabaseError> {
        self.filter.where_clause(conditions)?;
        Ok(self)
    }

    /// Apply a `find` request body (where, order, limit, offset)
    pub fn assign(mut self, data: FilterData) -> Result<Self, DatabaseError> {
        self.filter.assign(data)?;
        Ok(self)
    }

    pub fn order(mut self, order: Value) -> Result<Self, DatabaseError> {
        self.filter.order(order)?;
        Ok(self)
    }

    pub fn limit(mut self, limit: i64, offset: Option<i64>) -> Result<Self, DatabaseError> {
        self.filter.limit(Some(limit), offset)?;
        Ok(self)
    }

    pub fn with_trashed(mut self) -> Self {
        self.trash = TrashMode::Include;
        self
    }

    pub fn only_trashed(mut self) -> Self {
        self.trash = TrashMode::Only;
        self
    }

    pub fn trash_mode(mut self, trash: TrashMode) -> Self {
        self.trash = trash;
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, DatabaseError> {
        Ok(self.rendered().to_sql()?)
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, DatabaseError> {
        Ok(self.rendered().to_count_sql()?)
    }

    pub async fn all(self) -> Result<Vec<E>, DatabaseError> {
        let sql = self.to_sql()?;
        log_sql(&sql);
        let rows = bind_all(sqlx::query_as::<_, E>(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn first(mut self) -> Result<Option<E>, DatabaseError> {
        self.filter.limit(Some(1), None)?;
        let sql = self.to_sql()?;
        log_sql(&sql);
        let row = bind_all(sqlx::query_as::<_, E>(&sql.query), &sql.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn count(self) -> Result<i64, DatabaseError> {
        let sql = self.to_count_sql()?;
        log_sql(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    /// Filter with the soft-delete condition applied, unless the caller
    /// already constrained `is_deleted` themselves
    fn rendered(&self) -> Filter {
        let mut filter = self.filter.clone();
        if E::SOFT_DELETE && !filter.mentions_column(SOFT_DELETE_COLUMN) {
            match self.trash {
                TrashMode::Exclude => {
                    filter.condition(format!("\"{}\" = false", SOFT_DELETE_COLUMN));
                }
                TrashMode::Only => {
                    filter.condition(format!("\"{}\" = true", SOFT_DELETE_COLUMN));
                }
                TrashMode::Include => {}
            }
        }
        filter
    }
}

/// Query spanning several tables. Rows come back as one JSON object per
/// table, keyed by table name.
///
/// Join queries are never scoped implicitly; callers that expose them to a
/// tenant must add the owner condition themselves.
pub struct JoinQuery {
    pool: PgPool,
    tables: Vec<String>,
    from: String,
    filter: Filter,
}

impl JoinQuery {
    pub(crate) fn new<B: Entity>(pool: PgPool) -> Result<Self, DatabaseError> {
        let mut filter = Filter::new(B::TABLE)?;
        filter.limit(None, None)?;
        register_casts::<B>(&mut filter);
        Ok(Self {
            pool,
            tables: vec![B::TABLE.to_string()],
            from: quote_identifier(B::TABLE)?,
            filter,
        })
    }

    /// `INNER JOIN E ON left = right`, columns given as `table.column`
    pub fn join<E: Entity>(mut self, left: &str, right: &str) -> Result<Self, DatabaseError> {
        if self.tables.iter().any(|t| t == E::TABLE) {
            return Err(DatabaseError::QueryError(format!("table joined twice: {}", E::TABLE)));
        }
        self.from = format!(
            "{} JOIN {} ON {} = {}",
            self.from,
            quote_identifier(E::TABLE)?,
            quote_identifier(left)?,
            quote_identifier(right)?
        );
        self.tables.push(E::TABLE.to_string());
        register_casts::<E>(&mut self.filter);
        Ok(self)
    }

    pub fn filter(mut self, conditions: Value) -> Result<Self, DatabaseError> {
        self.filter.where_clause(conditions)?;
        Ok(self)
    }

    pub fn order(mut self, order: Value) -> Result<Self, DatabaseError> {
        self.filter.order(order)?;
        Ok(self)
    }

    pub fn limit(mut self, limit: i64, offset: Option<i64>) -> Result<Self, DatabaseError> {
        self.filter.limit(Some(limit), offset)?;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, DatabaseError> {
        let select = self
            .tables
            .iter()
            .map(|t| {
                let quoted = quote_identifier(t)?;
                Ok(format!("to_jsonb({q}) AS {q}", q = quoted))
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?
            .join(", ");
        Ok(self.filter.to_select_sql(&select, &self.from)?)
    }

    pub async fn all(self) -> Result<Vec<Map<String, Value>>, DatabaseError> {
        let sql = self.to_sql()?;
        log_sql(&sql);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(|row| self.row_to_map(row)).collect()
    }

    fn row_to_map(&self, row: &PgRow) -> Result<Map<String, Value>, DatabaseError> {
        let mut map = Map::with_capacity(self.tables.len());
        for table in &self.tables {
            let value: Option<Value> = row.try_get(table.as_str())?;
            map.insert(table.clone(), value.unwrap_or(Value::Null));
        }
        Ok(map)
    }
}

/// Cast filter values for `E`'s date and time columns, named bare or as
/// `table.column`
fn register_casts<E: Entity>(filter: &mut Filter) {
    for (column, kind) in E::temporal_columns() {
        filter.cast_column(*column, kind.sql_type());
        filter.cast_column(format!("{}.{}", E::TABLE, column), kind.sql_type());
    }
}

fn log_sql(sql: &SqlResult) {
    if crate::config::config().database.enable_query_logging {
        tracing::debug!(query = %sql.query, params = sql.params.len(), "executing query");
    }
}

fn bind_all<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    params: &'q [Value],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    for p in params {
        q = bind_param_query_as(q, p);
    }
    q
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => q.bind(None::<String>),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Filters only emit scalars; anything else goes over as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => q.bind(None::<String>),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
