use axum::extract::Query;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::database::models::{Lead, Quotation};
use crate::database::TenantSession;
use crate::middleware::{ApiResponse, ApiResult, CurrentTenant};

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuotationParams {
    pub lead_id: Option<i64>,
    pub status: Option<String>,
    /// Inclusive bounds on the quotation date, `YYYY-MM-DD`
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Quotations joined to their leads.
///
/// Joins bypass implicit scoping, so the owner condition on `leads` is added
/// here explicitly.
pub async fn lead_quotations(
    CurrentTenant(tenant): CurrentTenant,
    session: TenantSession,
    Query(params): Query<LeadQuotationParams>,
) -> ApiResult<Vec<Map<String, Value>>> {
    let mut query = session
        .query_join::<Lead>()?
        .join::<Quotation>("leads.id", "quotations.lead_id")?
        .filter(json!({ "leads.user_id": tenant.get(), "leads.is_deleted": false }))?
        .order(json!("quotations.id desc"))?;

    if let Some(lead_id) = params.lead_id {
        query = query.filter(json!({ "leads.id": lead_id }))?;
    }
    if let Some(status) = params.status {
        query = query.filter(json!({ "quotations.status": status }))?;
    }
    if let Some(from) = params.date_from {
        query = query.filter(json!({ "quotations.date": { "$gte": from } }))?;
    }
    if let Some(to) = params.date_to {
        query = query.filter(json!({ "quotations.date": { "$lte": to } }))?;
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit, params.offset)?;
    }

    let rows = query.all().await?;
    Ok(ApiResponse::success("Lead quotations fetched successfully.", rows))
}
