// handlers/elevated/root/tenant/create.rs - POST /api/root/tenant

use axum::{extract::State, Extension, Json};
use tracing::info;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, RootUser};
use crate::services::{ProvisionRequest, Provisioned};

/// Provision a tenant: namespace, tables, admin user, site entry and routing.
///
/// ```json
/// {
///   "name": "Acme",
///   "schema": "acme",
///   "domain": "acme.example.com",
///   "admin": { "username": "alice", "email": "a@acme.com" }
/// }
/// ```
///
/// 201 with the live tenant, 409 if the schema or domain is taken, 400 on
/// invalid input, 500 if a step failed (everything created so far is removed).
pub async fn tenant_create(
    State(state): State<AppState>,
    Extension(root): Extension<RootUser>,
    Json(request): Json<ProvisionRequest>,
) -> ApiResult<Provisioned> {
    info!("{} provisions tenant '{}'", root.subject, request.schema);
    let provisioned = state.provisioner.provision(request).await?;
    Ok(ApiResponse::created(provisioned))
}
