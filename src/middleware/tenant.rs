use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::debug;

use crate::auth::{key_fingerprint, ApiKeyResolver};
use crate::database::TenantSession;
use crate::error::ApiError;
use crate::tenant::{TenantId, TenantSlot};

const MAX_API_KEY_LEN: usize = 256;

/// Tenant resolved for this request, `None` when anonymous
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTenant(pub Option<TenantId>);

/// Runs the rest of the stack inside a fresh tenant slot.
///
/// The key from the configured header is resolved to a tenant and written to
/// the slot. Missing, malformed or unknown keys leave the request anonymous;
/// a resolver failure ends it with 503. The slot is cleared when the inner
/// service returns, unwinds, or is dropped.
pub async fn tenant_context_middleware(
    State(resolver): State<Arc<dyn ApiKeyResolver>>,
    request: Request,
    next: Next,
) -> Response {
    TenantSlot::scope(resolve_and_run(resolver, request, next)).await
}

async fn resolve_and_run(resolver: Arc<dyn ApiKeyResolver>, mut request: Request, next: Next) -> Response {
    let tenant = match extract_api_key(request.headers()) {
        None => None,
        Some(api_key) => match resolver.resolve(&api_key).await {
            Ok(Some(tenant)) => {
                debug!(key = %key_fingerprint(&api_key), %tenant, "API key resolved");
                Some(tenant)
            }
            Ok(None) => {
                debug!(key = %key_fingerprint(&api_key), "unknown or inactive API key; continuing anonymously");
                None
            }
            Err(e) => return ApiError::from(e).into_response(),
        },
    };

    request.extensions_mut().insert(RequestTenant(tenant));
    let _guard = TenantSlot::enter(tenant);
    next.run(request).await
}

/// Key from the configured header, if present and well formed
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    let header = &crate::config::config().api.api_key_header;
    let value = headers.get(header.as_str())?;
    let Ok(raw) = value.to_str() else {
        debug!("ignoring non-ASCII API key header");
        return None;
    };
    let key = raw.trim();
    if key.is_empty() || key.len() > MAX_API_KEY_LEN || key.chars().any(char::is_whitespace) {
        debug!("ignoring malformed API key header");
        return None;
    }
    Some(key.to_string())
}

/// Reject anonymous requests with 401
pub async fn require_tenant(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<RequestTenant>() {
        Some(RequestTenant(Some(_))) => Ok(next.run(request).await),
        _ => Err(ApiError::unauthorized("Invalid or missing API key")),
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestTenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<RequestTenant>().copied().unwrap_or(RequestTenant(None)))
    }
}

/// Tenant of an authenticated request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentTenant(pub TenantId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentTenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<RequestTenant>() {
            Some(RequestTenant(Some(tenant))) => Ok(CurrentTenant(*tenant)),
            _ => Err(ApiError::unauthorized("Invalid or missing API key")),
        }
    }
}

/// Session that follows the request's tenant slot
#[async_trait]
impl<S> FromRequestParts<S> for TenantSession
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(TenantSession::new(PgPool::from_ref(state)))
    }
}
