use serde_json::Value;

use super::error::FilterError;
use super::filter::quote_identifier;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)),
                        other => {
                            return Err(FilterError::InvalidWhereClause(format!("invalid order entry: {}", other)))
                        }
                    }
                }
                out
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                obj.iter()
                    .map(|(k, v)| FilterOrderInfo {
                        column: k.clone(),
                        sort: Self::direction(v.as_str().unwrap_or("asc")),
                    })
                    .collect()
            }
            Value::Null => vec![],
            other => return Err(FilterError::InvalidWhereClause(format!("invalid order: {}", other))),
        };

        for info in &infos {
            quote_identifier(&info.column).map_err(|_| FilterError::InvalidColumn(info.column.clone()))?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Vec<FilterOrderInfo> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let mut it = part.split_whitespace();
            if let Some(col) = it.next() {
                out.push(FilterOrderInfo {
                    column: col.to_string(),
                    sort: Self::direction(it.next().unwrap_or("asc")),
                });
            }
        }
        out
    }

    fn direction(dir: &str) -> SortDirection {
        if dir.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> Result<String, FilterError> {
        if infos.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(infos.len());
        for info in infos {
            parts.push(format!("{} {}", quote_identifier(&info.column)?, info.sort.to_sql()));
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }
}
