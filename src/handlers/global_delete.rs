use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::{TableInfo, TableRegistry, TenantSession};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RowParams {
    pub table: String,
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TableParams {
    pub table: String,
}

/// Client-facing message about `table`, worded with its display label
fn message(table: &TableInfo, outcome: &str) -> String {
    format!("{} {}", table.label, outcome)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/soft-delete", post(soft_delete))
        .route("/restore", post(restore))
        .route("/hard-delete", delete(hard_delete))
        .route("/trash", get(trash))
}

pub async fn soft_delete(
    State(registry): State<Arc<TableRegistry>>,
    session: TenantSession,
    Query(params): Query<RowParams>,
) -> ApiResult<Value> {
    let table = registry.resolve(&params.table)?;
    if !session.soft_delete(&table, params.id).await? {
        return Err(ApiError::not_found(message(&table, "not found or already in trash.")));
    }
    Ok(ApiResponse::success(message(&table, "moved to trash"), json!({ "id": params.id })))
}

pub async fn restore(
    State(registry): State<Arc<TableRegistry>>,
    session: TenantSession,
    Query(params): Query<RowParams>,
) -> ApiResult<Value> {
    let table = registry.resolve(&params.table)?;
    if !session.restore(&table, params.id).await? {
        return Err(ApiError::not_found(message(&table, "not found in trash.")));
    }
    Ok(ApiResponse::success(message(&table, "restored"), json!({ "id": params.id })))
}

pub async fn hard_delete(
    State(registry): State<Arc<TableRegistry>>,
    session: TenantSession,
    Query(params): Query<RowParams>,
) -> ApiResult<Value> {
    let table = registry.resolve(&params.table)?;
    if !session.hard_delete(&table, params.id).await? {
        return Err(ApiError::not_found(message(&table, "not found.")));
    }
    tracing::info!(table = table.name, id = params.id, "row permanently deleted");
    Ok(ApiResponse::success(message(&table, "permanently deleted"), json!({ "id": params.id })))
}

pub async fn trash(
    State(registry): State<Arc<TableRegistry>>,
    session: TenantSession,
    Query(params): Query<TableParams>,
) -> ApiResult<Vec<Value>> {
    let table = registry.resolve(&params.table)?;
    let rows = session.trash(&table).await?;
    Ok(ApiResponse::success(message(&table, "trash fetched"), rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_use_the_table_label() {
        let registry = TableRegistry::crm();
        let leads = registry.resolve("leads").unwrap();
        assert_eq!(message(&leads, "moved to trash"), "Lead moved to trash");

        let requests = registry.resolve("booking_requests").unwrap();
        let restored = message(&requests, "restored");
        assert!(!restored.contains("booking_requests"), "{restored}");
        assert!(restored.ends_with(" restored"));
    }
}
