use std::collections::BTreeMap;

use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, FixedCondition, SqlResult};

/// Accumulates predicates, ordering and paging for a single `SELECT`.
///
/// Where-fragments are ANDed in insertion order, so anything pushed first
/// (e.g. an ownership predicate) constrains every later fragment.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    conditions: Vec<FixedCondition>,
    where_data: Vec<Value>,
    casts: BTreeMap<String, &'static str>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            conditions: vec![],
            where_data: vec![],
            casts: BTreeMap::new(),
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if data.limit.is_some() || data.offset.is_some() {
            self.limit(data.limit, data.offset)?;
        }
        Ok(self)
    }

    /// Add a trusted, pre-rendered SQL condition. Never pass user input here.
    pub(crate) fn condition(&mut self, sql: impl Into<String>) -> &mut Self {
        self.conditions.push(FixedCondition::Raw(sql.into()));
        self
    }

    /// Trusted condition with one bound value; `$?` marks its placeholder
    pub(crate) fn bound_condition(&mut self, sql: impl Into<String>, value: Value) -> &mut Self {
        self.conditions.push(FixedCondition::Bound(sql.into(), value));
        self
    }

    /// Compare values against `column` as `sql_type` (e.g. `date`), as
    /// written in where-fragments: bare or `table.column`
    pub fn cast_column(&mut self, column: impl Into<String>, sql_type: &'static str) -> &mut Self {
        self.casts.insert(column.into(), sql_type);
        self
    }

    /// AND another where-fragment onto the filter
    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data.push(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit {
            if l < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }

        // Apply max limit from config
        let filter_config = &crate::config::config().filter;
        let requested = limit.unwrap_or(filter_config.default_limit);
        let applied = match filter_config.max_limit {
            Some(max) if requested > max => {
                if filter_config.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", requested, max);
                }
                max
            }
            _ => requested,
        };

        self.limit = Some(applied);
        self.offset = offset;
        Ok(self)
    }

    /// Whether any caller-supplied fragment references `column` (bare or table-qualified)
    pub fn mentions_column(&self, column: &str) -> bool {
        self.where_data.iter().any(|v| mentions(v, column))
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let from = quote_identifier(&self.table_name)?;
        self.to_select_sql("*", &from)
    }

    /// Render with a caller-built select list and FROM clause (used for joins)
    pub fn to_select_sql(&self, select_clause: &str, from_clause: &str) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data)?;

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM {}", from_clause),
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            order_clause,
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate(&self.conditions, &self.where_data, &self.casts)?;
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let table = quote_identifier(&self.table_name)?;
        let query = if where_result.query.is_empty() {
            format!("SELECT COUNT(*) AS count FROM {}", table)
        } else {
            format!("SELECT COUNT(*) AS count FROM {} WHERE {}", table, where_result.query)
        };
        Ok(SqlResult { query, params: where_result.params })
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Quote a column or table name, allowing one `table.column` qualifier
pub fn quote_identifier(name: &str) -> Result<String, FilterError> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 || !segments.iter().all(|s| is_identifier(s)) {
        return Err(FilterError::InvalidColumn(name.to_string()));
    }
    Ok(segments.iter().map(|s| format!("\"{}\"", s)).collect::<Vec<_>>().join("."))
}

fn mentions(value: &Value, column: &str) -> bool {
    match value {
        Value::Object(obj) => obj.iter().any(|(k, v)| {
            k == column || k.rsplit('.').next() == Some(column) || mentions(v, column)
        }),
        Value::Array(arr) => arr.iter().any(|v| mentions(v, column)),
        _ => false,
    }
}
