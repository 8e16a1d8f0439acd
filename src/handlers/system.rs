use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::DatabaseManager;
use crate::middleware::ApiResponse;

pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(
        "Travel CRM API",
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "public": "/public/booking-requests, /public/trip-inquiries (public)",
                "crud": "/api/{leads,booking-requests,trip-inquiries,landing-pages,categories,quotations}[/:id|/find] (API key)",
                "global": "/api/global/{soft-delete,restore,hard-delete,trash}?table=&id= (API key)",
                "reports": "/api/reports/lead-quotations (API key)",
            }
        }),
    )
}

pub async fn health(State(pool): State<PgPool>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&pool).await {
        Ok(_) => ApiResponse::success("ok", json!({ "status": "ok", "timestamp": now, "database": "ok" }))
            .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            let detail = if crate::is_production!() { "unavailable".to_string() } else { e.to_string() };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "database unavailable",
                    "status_code": 503,
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": detail
                    }
                })),
            )
                .into_response()
        }
    }
}
