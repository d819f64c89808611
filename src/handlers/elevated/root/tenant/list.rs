// handlers/elevated/root/tenant/list.rs - GET /api/root/tenant

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Tenant;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn tenant_list(State(state): State<AppState>) -> ApiResult<Vec<Tenant>> {
    let tenants = state.stores.tenants.list().await?;
    Ok(ApiResponse::success(tenants))
}
