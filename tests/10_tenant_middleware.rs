mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use travel_crm::tenant::TenantSlot;

async fn get_json(router: Router, uri: &str, api_key: Option<&str>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    let response = router.oneshot(builder.body(Body::empty())?).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn anonymous_request_sees_no_tenant() -> Result<()> {
    let (status, body) = get_json(common::whoami_router(common::static_resolver()), "/whoami", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body["before"].is_null());
    assert!(body["after"].is_null());
    assert!(body["extension"].is_null());
    Ok(())
}

#[tokio::test]
async fn valid_key_sets_the_tenant_for_the_whole_handler() -> Result<()> {
    let (status, body) =
        get_json(common::whoami_router(common::static_resolver()), "/whoami", Some(common::BETA_KEY)).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["before"], 2);
    assert_eq!(body["after"], 2);
    assert_eq!(body["extension"], 2);
    Ok(())
}

#[tokio::test]
async fn unknown_or_malformed_key_continues_anonymously() -> Result<()> {
    for key in ["crm_nobody", "has space"] {
        let (status, body) = get_json(common::whoami_router(common::static_resolver()), "/whoami", Some(key)).await?;
        assert_eq!(status, StatusCode::OK, "key {key:?}");
        assert!(body["before"].is_null(), "key {key:?}");
    }
    Ok(())
}

#[tokio::test]
async fn resolver_failure_is_service_unavailable() -> Result<()> {
    let router = common::whoami_router(Arc::new(common::FailingResolver));
    let (status, body) = get_json(router, "/whoami", Some(common::ALPHA_KEY)).await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn resolver_is_not_consulted_without_a_key() -> Result<()> {
    let router = common::whoami_router(Arc::new(common::FailingResolver));
    let (status, body) = get_json(router, "/whoami", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(body["before"].is_null());
    Ok(())
}

#[tokio::test]
async fn request_slot_does_not_leak_into_the_caller() -> Result<()> {
    TenantSlot::scope(async {
        TenantSlot::set(Some(common::tenant(99)));

        let (_, body) =
            get_json(common::whoami_router(common::static_resolver()), "/whoami", Some(common::ALPHA_KEY)).await?;
        assert_eq!(body["before"], 1);

        assert_eq!(TenantSlot::current(), Some(common::tenant(99)));
        Ok::<_, anyhow::Error>(())
    })
    .await?;

    assert_eq!(TenantSlot::current(), None);
    Ok(())
}

#[tokio::test]
async fn secured_routes_reject_anonymous_requests() -> Result<()> {
    let (status, body) = get_json(common::app_router(common::static_resolver()), "/api/leads", None).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) =
        get_json(common::app_router(common::static_resolver()), "/api/global/trash?table=leads", Some("crm_nobody"))
            .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn authorized_requests_reach_the_handler() -> Result<()> {
    // The pool is unreachable, so getting past the auth layer surfaces as a
    // database outage rather than 401.
    let (status, _) =
        get_json(common::app_router(common::static_resolver()), "/api/leads", Some(common::ALPHA_KEY)).await?;

    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert!(status.is_server_error(), "unexpected status {status}");
    Ok(())
}

#[tokio::test]
async fn unknown_table_is_a_bad_request() -> Result<()> {
    let (status, body) = get_json(
        common::app_router(common::static_resolver()),
        "/api/global/trash?table=passwords",
        Some(common::ALPHA_KEY),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn root_is_public() -> Result<()> {
    let (status, body) = get_json(common::app_router(common::static_resolver()), "/", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "travel-crm");
    Ok(())
}
