//! Generic CRUD endpoints, mounted once per entity type.
//!
//! Every handler works through a [`TenantSession`], so reads and writes are
//! confined to the caller's rows without any tenant handling here.

use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::{Entity, TenantSession};
use crate::error::ApiError;
use crate::filter::{FilterData, TrashMode};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// e.g. `created_at desc,name`
    pub order: Option<String>,
    #[serde(default)]
    pub with_trashed: bool,
    #[serde(default)]
    pub only_trashed: bool,
}

impl ListParams {
    fn trash_mode(&self) -> TrashMode {
        if self.only_trashed {
            TrashMode::Only
        } else if self.with_trashed {
            TrashMode::Include
        } else {
            TrashMode::Exclude
        }
    }
}

pub fn routes<E: Entity>() -> Router<AppState> {
    Router::new()
        .route("/", post(create::<E>).get(list::<E>))
        .route("/find", post(find::<E>))
        .route("/:id", get(show::<E>).put(update::<E>).delete(destroy::<E>))
}

pub async fn create<E: Entity>(
    session: TenantSession,
    payload: Result<Json<E>, JsonRejection>,
) -> ApiResult<E> {
    let Json(entity) = payload?;
    let row = session.add(entity).await?;
    Ok(ApiResponse::created(format!("{} created successfully.", E::LABEL), row))
}

pub async fn list<E: Entity>(session: TenantSession, Query(params): Query<ListParams>) -> ApiResult<Value> {
    let mut query = session.query::<E>()?.trash_mode(params.trash_mode());
    if let Some(order) = &params.order {
        query = query.order(json!(order))?;
    }
    if params.limit.is_some() || params.offset.is_some() {
        let limit = params.limit.unwrap_or(crate::config::config().filter.default_limit);
        query = query.limit(limit, params.offset)?;
    }

    let total = session.query::<E>()?.trash_mode(params.trash_mode()).count().await?;
    let items = query.all().await?;
    Ok(ApiResponse::success(
        format!("{} list fetched successfully.", E::LABEL),
        json!({ "items": items, "total": total }),
    ))
}

/// `POST /find` with a filter body
pub async fn find<E: Entity>(
    session: TenantSession,
    payload: Result<Json<FilterData>, JsonRejection>,
) -> ApiResult<Vec<E>> {
    let Json(filter) = payload?;
    let rows = session.query::<E>()?.assign(filter)?.all().await?;
    Ok(ApiResponse::success(format!("{} search completed.", E::LABEL), rows))
}

pub async fn show<E: Entity>(session: TenantSession, Path(id): Path<i64>) -> ApiResult<E> {
    let row = session.find::<E>(id).await?.ok_or_else(|| not_found::<E>())?;
    Ok(ApiResponse::success(format!("{} fetched successfully.", E::LABEL), row))
}

pub async fn update<E: Entity>(
    session: TenantSession,
    Path(id): Path<i64>,
    payload: Result<Json<E>, JsonRejection>,
) -> ApiResult<E> {
    let Json(entity) = payload?;
    let row = session.update(id, &entity).await?.ok_or_else(|| not_found::<E>())?;
    Ok(ApiResponse::success(format!("{} updated successfully.", E::LABEL), row))
}

pub async fn destroy<E: Entity>(session: TenantSession, Path(id): Path<i64>) -> ApiResult<Value> {
    if !session.delete::<E>(id).await? {
        return Err(not_found::<E>());
    }
    Ok(ApiResponse::success(format!("{} deleted successfully.", E::LABEL), json!({ "id": id })))
}

fn not_found<E: Entity>() -> ApiError {
    ApiError::not_found(format!("{} not found.", E::LABEL))
}
