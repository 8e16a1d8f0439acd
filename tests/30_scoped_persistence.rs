//! Ownership rules against a real Postgres. Set `DATABASE_URL` to run;
//! without it every test returns early.

mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use travel_crm::auth::StaticApiKeyResolver;
use travel_crm::database::models::{Lead, Quotation};
use travel_crm::database::{DatabaseError, TableInfo, TenantSession};
use travel_crm::tenant::{TenantId, TenantSlot};

const OWNER_KEY: &str = "crm_owner";
const OTHER_KEY: &str = "crm_other";

fn lead(name: &str) -> Lead {
    serde_json::from_value(json!({
        "name": name,
        "email": "lead@example.com",
        "mobile": "+91 90000 00000",
        "destination_type": "Domestic",
        "travel_from": "2025-02-01",
        "travel_to": "2025-02-06"
    }))
    .unwrap()
}

fn quotation(lead_id: i64) -> Quotation {
    serde_json::from_value(json!({
        "lead_id": lead_id,
        "design": "Kerala backwaters, 5 nights",
        "amount": 120000,
        "date": "2025-01-20"
    }))
    .unwrap()
}

/// Two fresh accounts and a router whose keys resolve to them
async fn two_tenants(pool: &PgPool) -> Result<(TenantId, TenantId, Router)> {
    let owner = common::create_user(pool, "owner").await?;
    let other = common::create_user(pool, "other").await?;
    let resolver = StaticApiKeyResolver::new()
        .with_key(OWNER_KEY, owner)
        .with_key(OTHER_KEY, other);
    let router = common::app_router_with(pool.clone(), Arc::new(resolver));
    Ok((owner, other, router))
}

async fn send(router: &Router, method: Method, uri: &str, key: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri).header("x-api-key", key);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn ids(rows: &Value) -> Vec<i64> {
    rows.as_array()
        .map(|rows| rows.iter().filter_map(|row| row["id"].as_i64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn rows_are_visible_only_to_their_owner() -> Result<()> {
    let Some(pool) = common::database().await? else {
        return Ok(());
    };
    let owner = common::create_user(&pool, "seven").await?;
    let other = common::create_user(&pool, "nine").await?;
    let session = TenantSession::new(pool.clone());

    let created = TenantSlot::scope(async {
        TenantSlot::set(Some(owner));
        session.add(lead("Asha Rao")).await
    })
    .await?;
    assert_eq!(created.user_id, owner.get());

    let (seen_by_other, listed_by_other) = TenantSlot::scope(async {
        TenantSlot::set(Some(other));
        let found = session.find::<Lead>(created.id).await?;
        let listed = session.query::<Lead>()?.all().await?;
        Ok::<_, DatabaseError>((found, listed))
    })
    .await?;
    assert!(seen_by_other.is_none());
    assert!(listed_by_other.iter().all(|row| row.id != created.id));

    let seen_by_owner = TenantSlot::scope(async {
        TenantSlot::set(Some(owner));
        session.find::<Lead>(created.id).await
    })
    .await?;
    assert_eq!(seen_by_owner.map(|row| row.name), Some("Asha Rao".to_string()));
    Ok(())
}

#[tokio::test]
async fn cross_tenant_writes_touch_nothing() -> Result<()> {
    let Some(pool) = common::database().await? else {
        return Ok(());
    };
    let owner = common::create_user(&pool, "owner").await?;
    let other = common::create_user(&pool, "intruder").await?;
    let mine = TenantSession::pinned(pool.clone(), owner);
    let theirs = TenantSession::pinned(pool.clone(), other);
    let leads = TableInfo::of::<Lead>();

    let created = mine.add(lead("Original")).await?;

    assert!(theirs.update(created.id, &lead("Hijacked")).await?.is_none());
    assert!(!theirs.soft_delete(&leads, created.id).await?);
    assert!(!theirs.hard_delete(&leads, created.id).await?);
    assert!(!theirs.delete::<Lead>(created.id).await?);

    let untouched = mine.find::<Lead>(created.id).await?.expect("owner still sees the lead");
    assert_eq!(untouched.name, "Original");
    assert!(!untouched.is_deleted);

    assert!(mine.soft_delete(&leads, created.id).await?);
    assert!(!theirs.restore(&leads, created.id).await?);
    assert!(theirs.trash(&leads).await?.iter().all(|row| row["id"] != json!(created.id)));
    assert!(mine.restore(&leads, created.id).await?);
    Ok(())
}

#[tokio::test]
async fn other_tenants_rows_are_not_found_over_http() -> Result<()> {
    let Some(pool) = common::database().await? else {
        return Ok(());
    };
    let (owner, _, router) = two_tenants(&pool).await?;
    let created = TenantSession::pinned(pool.clone(), owner).add(lead("Over HTTP")).await?;
    let id = created.id;

    let (status, body) = send(&router, Method::GET, &format!("/api/leads/{id}"), OTHER_KEY, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Lead not found.");

    let update = serde_json::to_value(lead("Hijacked"))?;
    let (status, _) = send(&router, Method::PUT, &format!("/api/leads/{id}"), OTHER_KEY, Some(update)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, Method::DELETE, &format!("/api/leads/{id}"), OTHER_KEY, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let soft_delete = format!("/api/global/soft-delete?table=leads&id={id}");
    let (status, body) = send(&router, Method::POST, &soft_delete, OTHER_KEY, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Lead not found or already in trash.");

    let (status, body) = send(&router, Method::POST, &soft_delete, OWNER_KEY, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lead moved to trash");

    let restore = format!("/api/global/restore?table=leads&id={id}");
    let (status, body) = send(&router, Method::POST, &restore, OWNER_KEY, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Lead restored");
    Ok(())
}

#[tokio::test]
async fn date_and_timestamp_filters_compare_as_dates() -> Result<()> {
    let Some(pool) = common::database().await? else {
        return Ok(());
    };
    let (owner, _, router) = two_tenants(&pool).await?;
    let created = TenantSession::pinned(pool.clone(), owner).add(lead("Dated")).await?;

    let wheres = [
        json!({ "travel_from": "2025-02-01" }),
        json!({ "travel_from": { "$between": ["2025-01-01", "2025-03-01"] } }),
        json!({ "travel_to": { "$gt": "2025-02-01" }, "follow_up_date": null }),
        json!({ "created_at": { "$gte": "2000-01-01T00:00:00Z" } }),
    ];
    for filter in wheres {
        let (status, body) =
            send(&router, Method::POST, "/api/leads/find", OWNER_KEY, Some(json!({ "where": filter }))).await?;
        assert_eq!(status, StatusCode::OK, "{filter}: {body}");
        assert!(ids(&body["data"]).contains(&created.id), "{filter}: {body}");
    }

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/leads/find",
        OWNER_KEY,
        Some(json!({ "where": { "travel_from": { "$lt": "2025-01-01" } } })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(!ids(&body["data"]).contains(&created.id));

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/leads/find",
        OWNER_KEY,
        Some(json!({ "where": { "travel_from": "next tuesday" } })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn quotations_follow_their_lead_owner() -> Result<()> {
    let Some(pool) = common::database().await? else {
        return Ok(());
    };
    let (owner, other, router) = two_tenants(&pool).await?;
    let mine = TenantSession::pinned(pool.clone(), owner);
    let theirs = TenantSession::pinned(pool.clone(), other);

    let my_lead = mine.add(lead("Quoted")).await?;
    assert!(matches!(
        theirs.add(quotation(my_lead.id)).await,
        Err(DatabaseError::NotFound(_))
    ));

    let quote = mine.add(quotation(my_lead.id)).await?;
    assert!(mine.find::<Quotation>(quote.id).await?.is_some());
    assert!(theirs.find::<Quotation>(quote.id).await?.is_none());
    assert!(theirs.query::<Quotation>()?.all().await?.iter().all(|q| q.id != quote.id));
    assert!(theirs.update(quote.id, &quotation(my_lead.id)).await.is_err());
    assert!(!theirs.delete::<Quotation>(quote.id).await?);

    // Re-pointing a quotation at someone else's lead is refused too
    let their_lead = theirs.add(lead("Elsewhere")).await?;
    assert!(matches!(
        mine.update(quote.id, &quotation(their_lead.id)).await,
        Err(DatabaseError::NotFound(_))
    ));

    let (status, _) = send(&router, Method::GET, &format!("/api/quotations/{}", quote.id), OTHER_KEY, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/global/hard-delete?table=quotations&id={}", quote.id),
        OTHER_KEY,
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let report = format!("/api/reports/lead-quotations?lead_id={}&date_from=2025-01-01&date_to=2025-01-31", my_lead.id);
    let (status, body) = send(&router, Method::GET, &report, OWNER_KEY, None).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["quotations"]["id"], json!(quote.id));

    let later = format!("/api/reports/lead-quotations?lead_id={}&date_from=2025-02-01", my_lead.id);
    let (status, body) = send(&router, Method::GET, &later, OWNER_KEY, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    // Trashing the lead hides its quotations
    assert!(mine.soft_delete(&TableInfo::of::<Lead>(), my_lead.id).await?);
    assert!(mine.find::<Quotation>(quote.id).await?.is_none());
    Ok(())
}
