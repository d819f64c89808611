// handlers/elevated/root/tenant/show.rs - GET /api/root/tenant/:schema

use axum::extract::{Path, State};
use serde::Serialize;

use super::schema_param;
use crate::app::AppState;
use crate::database::models::{Domain, Tenant};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct TenantDetails {
    pub tenant: Tenant,
    pub domains: Vec<Domain>,
}

pub async fn tenant_show(
    State(state): State<AppState>,
    Path(schema): Path<String>,
) -> ApiResult<TenantDetails> {
    let schema = schema_param(&schema)?;
    let tenant = state
        .stores
        .tenants
        .find_by_schema(&schema)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tenant not found: {}", schema)))?;
    let domains = state.stores.domains.list_for_tenant(tenant.id).await?;

    Ok(ApiResponse::success(TenantDetails { tenant, domains }))
}
