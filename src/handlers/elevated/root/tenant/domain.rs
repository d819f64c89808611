// handlers/elevated/root/tenant/domain.rs - POST /api/root/tenant/:schema/domain

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Domain;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct AddDomain {
    pub domain: String,
    #[serde(default)]
    pub is_primary: bool,
}

pub async fn tenant_domain_add(
    State(state): State<AppState>,
    Path(schema): Path<String>,
    Json(body): Json<AddDomain>,
) -> ApiResult<Domain> {
    let domain = state
        .provisioner
        .add_domain(&schema, &body.domain, body.is_primary)
        .await?;
    Ok(ApiResponse::created(domain))
}
