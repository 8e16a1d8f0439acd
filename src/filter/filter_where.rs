use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter::quote_identifier;
use super::types::{FilterOp, FixedCondition};

/// Compiles JSON where-fragments into a parameterised Postgres predicate.
///
/// Placeholders are numbered from a single counter shared by every nested
/// group, so `$n` always matches the position of its value in `params`.
/// Values compared against a column listed in `casts` get an explicit
/// `$n::type` cast, since JSON strings are bound as text.
pub struct FilterWhere<'a> {
    params: Vec<Value>,
    casts: &'a BTreeMap<String, &'static str>,
}

impl<'a> FilterWhere<'a> {
    /// AND together trusted `fixed` SQL conditions followed by each fragment, in order.
    pub fn generate(
        fixed: &[FixedCondition],
        fragments: &[Value],
        casts: &'a BTreeMap<String, &'static str>,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self { params: vec![], casts };
        let mut parts = Vec::with_capacity(fixed.len() + fragments.len());
        for condition in fixed {
            match condition {
                FixedCondition::Raw(sql) => parts.push(sql.clone()),
                FixedCondition::Bound(sql, value) => {
                    let placeholder = filter_where.param(value, None)?;
                    parts.push(sql.replacen("$?", &placeholder, 1));
                }
            }
        }
        for fragment in fragments {
            if let Some(sql) = filter_where.group(fragment)? {
                parts.push(sql);
            }
        }
        Ok((parts.join(" AND "), filter_where.params))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn group(&mut self, data: &Value) -> Result<Option<String>, FilterError> {
        let obj = data
            .as_object()
            .ok_or_else(|| FilterError::InvalidWhereClause("WHERE must be an object".to_string()))?;
        let mut parts = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.logical(key, value)?);
            } else {
                parts.push(self.field(key, value)?);
            }
        }
        Ok(if parts.is_empty() { None } else { Some(parts.join(" AND ")) })
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                // An empty member matches everything, which settles an $or
                if op == "$or" && arr.iter().any(|m| m.as_object().is_some_and(Map::is_empty)) {
                    return Ok("1=1".to_string());
                }
                let mut members = Vec::with_capacity(arr.len());
                for member in arr {
                    if let Some(sql) = self.group(member)? {
                        members.push(format!("({})", sql));
                    }
                }
                if members.is_empty() {
                    // Empty conjunction is true, empty disjunction is false
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", members.join(joiner)))
            }
            "$not" => match self.group(value)? {
                Some(sql) => Ok(format!("NOT ({})", sql)),
                None => Err(FilterError::InvalidOperatorData("$not requires conditions".to_string())),
            },
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field(&mut self, field: &str, value: &Value) -> Result<String, FilterError> {
        let column = quote_identifier(field).map_err(|_| FilterError::InvalidColumn(field.to_string()))?;
        let cast = self.casts.get(field).copied();
        match value {
            Value::Object(ops) => self.operators(&column, cast, ops),
            Value::Array(_) => self.condition(&column, cast, &FilterOp::In, value),
            // Implicit equality: { field: value }
            _ => self.condition(&column, cast, &FilterOp::Eq, value),
        }
    }

    fn operators(
        &mut self,
        column: &str,
        cast: Option<&'static str>,
        ops: &Map<String, Value>,
    ) -> Result<String, FilterError> {
        if ops.is_empty() {
            return Err(FilterError::InvalidOperatorData(format!("no operators given for {}", column)));
        }
        let mut parts = Vec::with_capacity(ops.len());
        for (op_key, data) in ops {
            let op = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
            parts.push(self.condition(column, cast, &op, data)?);
        }
        Ok(parts.join(" AND "))
    }

    fn condition(
        &mut self,
        column: &str,
        cast: Option<&'static str>,
        op: &FilterOp,
        data: &Value,
    ) -> Result<String, FilterError> {
        let sql = match op {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", column),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", column),
            FilterOp::Eq => format!("{} = {}", column, self.param(data, cast)?),
            FilterOp::Ne => format!("{} <> {}", column, self.param(data, cast)?),
            FilterOp::Gt => format!("{} > {}", column, self.param(data, cast)?),
            FilterOp::Gte => format!("{} >= {}", column, self.param(data, cast)?),
            FilterOp::Lt => format!("{} < {}", column, self.param(data, cast)?),
            FilterOp::Lte => format!("{} <= {}", column, self.param(data, cast)?),
            // Patterns are always text
            FilterOp::Like => format!("{} LIKE {}", column, self.param(data, None)?),
            FilterOp::ILike => format!("{} ILIKE {}", column, self.param(data, None)?),
            FilterOp::In | FilterOp::NIn => {
                let negate = *op == FilterOp::NIn;
                let values = match data {
                    Value::Array(values) => values.as_slice(),
                    single => std::slice::from_ref(single),
                };
                if values.is_empty() {
                    return Ok(if negate { "1=1" } else { "1=0" }.to_string());
                }
                let mut placeholders = Vec::with_capacity(values.len());
                for v in values {
                    placeholders.push(self.param(v, cast)?);
                }
                let keyword = if negate { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, keyword, placeholders.join(", "))
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(&values[0], cast)?;
                    let high = self.param(&values[1], cast)?;
                    format!("{} BETWEEN {} AND {}", column, low, high)
                }
                _ => {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ))
                }
            },
            FilterOp::Null => match data {
                Value::Bool(true) => format!("{} IS NULL", column),
                Value::Bool(false) => format!("{} IS NOT NULL", column),
                _ => return Err(FilterError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
        };
        Ok(sql)
    }

    fn param(&mut self, value: &Value, cast: Option<&'static str>) -> Result<String, FilterError> {
        if value.is_array() || value.is_object() {
            return Err(FilterError::InvalidOperatorData(format!("expected a scalar value, got {}", value)));
        }
        self.params.push(value.clone());
        Ok(match cast {
            Some(sql_type) => format!("${}::{}", self.params.len(), sql_type),
            None => format!("${}", self.params.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generate(fixed: &[FixedCondition], fragments: &[Value]) -> Result<(String, Vec<Value>), FilterError> {
        FilterWhere::generate(fixed, fragments, &BTreeMap::new())
    }

    #[test]
    fn implicit_equality_and_null() {
        let (sql, params) = generate(&[], &[json!({ "status": "New", "assigned_to": null })]).unwrap();
        // serde_json maps iterate in key order
        assert_eq!(sql, "\"assigned_to\" IS NULL AND \"status\" = $1");
        assert_eq!(params, vec![json!("New")]);
    }

    #[test]
    fn fixed_conditions_come_first_and_fragments_are_anded_in_order() {
        let fixed = vec![FixedCondition::Raw("\"is_deleted\" = false".to_string())];
        let (sql, params) = generate(&fixed, &[json!({ "user_id": 7 }), json!({ "id": 3 })]).unwrap();
        assert_eq!(sql, "\"is_deleted\" = false AND \"user_id\" = $1 AND \"id\" = $2");
        assert_eq!(params, vec![json!(7), json!(3)]);
    }

    #[test]
    fn nested_groups_share_one_placeholder_counter() {
        let where_data = json!({
            "$or": [
                { "status": "New" },
                { "$and": [ { "adults": { "$gte": 2 } }, { "priority": { "$in": ["High", "Urgent"] } } ] }
            ],
            "name": { "$ilike": "%smith%" }
        });
        let (sql, params) = generate(&[], &[where_data]).unwrap();
        assert_eq!(
            sql,
            "((\"status\" = $1) OR (((\"adults\" >= $2) AND (\"priority\" IN ($3, $4))))) AND \"name\" ILIKE $5"
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[4], json!("%smith%"));
    }

    #[test]
    fn empty_in_lists_short_circuit() {
        let (sql, params) = generate(&[], &[json!({ "id": { "$in": [] }, "lead_id": { "$nin": [] } })]).unwrap();
        assert_eq!(sql, "1=0 AND 1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn qualified_columns_are_quoted_per_segment() {
        let (sql, _) = generate(&[], &[json!({ "leads.user_id": 9 })]).unwrap();
        assert_eq!(sql, "\"leads\".\"user_id\" = $1");
    }

    #[test]
    fn rejects_injection_in_column_names() {
        let err = generate(&[], &[json!({ "id\" OR 1=1 --": 1 })]).unwrap_err();
        assert!(matches!(err, FilterError::InvalidColumn(_)));
    }

    #[test]
    fn rejects_unknown_operators_and_bad_between() {
        assert!(matches!(
            generate(&[], &[json!({ "id": { "$regex": "x" } })]),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            generate(&[], &[json!({ "id": { "$between": [1] } })]),
            Err(FilterError::InvalidOperatorData(_))
        ));
    }

    #[test]
    fn not_wraps_group() {
        let (sql, _) = generate(&[], &[json!({ "$not": { "status": "Lost" } })]).unwrap();
        assert_eq!(sql, "NOT (\"status\" = $1)");
    }

    #[test]
    fn empty_or_member_matches_everything() {
        let (sql, params) = generate(&[], &[json!({ "$or": [ { "status": "New" }, {} ], "id": 4 })]).unwrap();
        assert_eq!(sql, "1=1 AND \"id\" = $1");
        assert_eq!(params, vec![json!(4)]);

        let (sql, _) = generate(&[], &[json!({ "$and": [ {}, { "status": "New" } ] })]).unwrap();
        assert_eq!(sql, "((\"status\" = $1))");
    }

    #[test]
    fn cast_columns_get_typed_placeholders() {
        let mut casts = BTreeMap::new();
        casts.insert("travel_from".to_string(), "date");
        casts.insert("leads.created_at".to_string(), "timestamptz");
        let where_data = json!({
            "travel_from": { "$between": ["2025-01-01", "2025-01-31"] },
            "leads.created_at": { "$gte": "2020-01-01" },
            "name": { "$like": "A%" }
        });
        let (sql, params) = FilterWhere::generate(&[], &[where_data], &casts).unwrap();
        assert_eq!(
            sql,
            "\"leads\".\"created_at\" >= $1::timestamptz AND \"name\" LIKE $2 AND \"travel_from\" BETWEEN $3::date AND $4::date"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn bound_fixed_conditions_take_the_first_placeholders() {
        let fixed = vec![
            FixedCondition::Bound("\"lead_id\" IN (SELECT \"id\" FROM \"leads\" WHERE \"user_id\" = $?)".to_string(), json!(7)),
            FixedCondition::Raw("\"is_deleted\" = false".to_string()),
        ];
        let (sql, params) = generate(&fixed, &[json!({ "status": "Sent" })]).unwrap();
        assert_eq!(
            sql,
            "\"lead_id\" IN (SELECT \"id\" FROM \"leads\" WHERE \"user_id\" = $1) AND \"is_deleted\" = false AND \"status\" = $2"
        );
        assert_eq!(params, vec![json!(7), json!("Sent")]);
    }
}
