use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::ApiKeyResolver;
use crate::database::models::{BookingRequest, Category, LandingPage, Lead, Quotation, TripInquiry};
use crate::database::TableRegistry;
use crate::handlers::{crud, global_delete, public, reports, system};
use crate::middleware::{require_tenant, tenant_context_middleware};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub resolver: Arc<dyn ApiKeyResolver>,
    pub registry: Arc<TableRegistry>,
}

impl AppState {
    pub fn new(pool: PgPool, resolver: Arc<dyn ApiKeyResolver>) -> Self {
        Self {
            pool,
            resolver,
            registry: Arc::new(TableRegistry::crm()),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<TableRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let secure = Router::new()
        .nest("/leads", crud::routes::<Lead>())
        .nest("/booking-requests", crud::routes::<BookingRequest>())
        .nest("/trip-inquiries", crud::routes::<TripInquiry>())
        .nest("/landing-pages", crud::routes::<LandingPage>())
        .nest("/categories", crud::routes::<Category>())
        .nest("/quotations", crud::routes::<Quotation>())
        .nest("/global", global_delete::routes())
        .route("/reports/lead-quotations", get(reports::lead_quotations))
        .route_layer(from_fn(require_tenant));

    let router = Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/public", public::routes())
        .nest("/api", secure)
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer())
                .layer(from_fn_with_state(state.resolver.clone(), tenant_context_middleware)),
        )
        .with_state(state);

    if crate::config::config().api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await
}

fn cors_layer() -> CorsLayer {
    let security = &crate::config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let api_key_header = HeaderName::from_bytes(crate::config::config().api.api_key_header.as_bytes())
        .unwrap_or_else(|_| HeaderName::from_static("x-api-key"));
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, api_key_header]);

    if security.cors_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = security
            .cors_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
