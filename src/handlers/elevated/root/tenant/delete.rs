// handlers/elevated/root/tenant/delete.rs - DELETE /api/root/tenant/:schema

use axum::extract::{Path, Query, State};
use axum::Extension;
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, RootUser};
use crate::services::Decommissioned;

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    /// Must repeat the schema identifier
    pub confirm: Option<String>,
}

/// Drops the namespace and every routing entry. Irreversible.
pub async fn tenant_delete(
    State(state): State<AppState>,
    Path(schema): Path<String>,
    Query(params): Query<DeleteParams>,
    Extension(root): Extension<RootUser>,
) -> ApiResult<Decommissioned> {
    info!("{} decommissions tenant '{}'", root.subject, schema);
    let confirmation = params.confirm.unwrap_or_default();
    let gone = state.provisioner.decommission(&schema, &confirmation).await?;
    Ok(ApiResponse::success(gone))
}
