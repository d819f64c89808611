// handlers/elevated/root/tenant/health.rs - GET /api/root/tenant/:schema/health

use axum::extract::{Path, State};
use serde::Serialize;

use super::schema_param;
use crate::app::AppState;
use crate::database::models::TenantStatus;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct TenantHealth {
    pub schema: String,
    pub status: TenantStatus,
    pub namespace_exists: bool,
    pub admin_count: i64,
    pub healthy: bool,
}

/// Catalog row, namespace and seeded admin must all be present
pub async fn tenant_health(
    State(state): State<AppState>,
    Path(schema): Path<String>,
) -> ApiResult<TenantHealth> {
    let schema = schema_param(&schema)?;
    let tenant = state
        .stores
        .tenants
        .find_by_schema(&schema)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tenant not found: {}", schema)))?;

    let namespace_exists = state.stores.schemas.namespace_exists(&schema).await?;
    let admin_count = if namespace_exists {
        state.stores.schemas.count_admins(&schema).await?
    } else {
        0
    };

    Ok(ApiResponse::success(TenantHealth {
        schema: schema.to_string(),
        status: tenant.status,
        namespace_exists,
        admin_count,
        healthy: tenant.is_active() && namespace_exists && admin_count > 0,
    }))
}
