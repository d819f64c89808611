// handlers/protected/mod.rs - Endpoints that only exist inside a tenant

use serde::Serialize;

use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult, RequiredTenant};
use crate::types::Namespace;

#[derive(Debug, Serialize)]
pub struct CurrentTenant {
    pub namespace: Namespace,
    pub tenant: Tenant,
}

/// GET /api/tenant - the tenant this host routes to
pub async fn tenant_current(required: RequiredTenant) -> ApiResult<CurrentTenant> {
    Ok(ApiResponse::success(CurrentTenant {
        namespace: required.namespace,
        tenant: required.tenant,
    }))
}
