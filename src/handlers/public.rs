//! Endpoints called from tenants' public websites. No API key is required.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use sqlx::PgPool;

use crate::app::AppState;
use crate::database::models::{BookingRequest, TripInquiry};
use crate::database::{service, OwnedEntity, TenantSession};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/booking-requests", post(create_booking_request))
        .route("/trip-inquiries", post(create_trip_inquiry))
}

/// Booking from a public site; the owner is the account serving `domain_name`
pub async fn create_booking_request(
    State(pool): State<PgPool>,
    session: TenantSession,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> ApiResult<BookingRequest> {
    let Json(mut booking) = payload?;

    let domain = booking
        .domain_name
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("domain_name is required"))?;
    let owner = service::find_owner_by_domain(&pool, domain)
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid domain name – user not found."))?;

    booking.set_owner_id(owner);
    let row = session.add(booking).await?;
    Ok(ApiResponse::created("Booking request submitted successfully.", row))
}

/// Enquiry form; stamped with the caller's tenant when a key is sent
pub async fn create_trip_inquiry(
    session: TenantSession,
    payload: Result<Json<TripInquiry>, JsonRejection>,
) -> ApiResult<TripInquiry> {
    let Json(inquiry) = payload?;
    let row = session.add(inquiry).await?;
    Ok(ApiResponse::created("Trip inquiry submitted successfully.", row))
}
