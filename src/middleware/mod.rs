pub mod response;
pub mod tenant;

pub use response::{ApiResponse, ApiResult};
pub use tenant::{extract_api_key, require_tenant, tenant_context_middleware, CurrentTenant, RequestTenant};
