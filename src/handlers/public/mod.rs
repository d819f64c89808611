// handlers/public/mod.rs - Endpoints served on any host
//
// `/health` and the not-found page are exempt from tenant resolution so they
// answer even for hosts that do not map to a tenant.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::TenantContext;

pub async fn root(ctx: TenantContext) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "tenant-gate",
            "version": env!("CARGO_PKG_VERSION"),
            "namespace": ctx.namespace,
            "endpoints": {
                "health": "/health (public, no tenant resolution)",
                "tenant": "/api/tenant (tenant hosts)",
                "root": "/api/root/tenant[/:schema] (public host only)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.stores.schemas.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

/// Target of the redirect issued for unknown tenants
pub async fn tenant_not_found() -> ApiError {
    ApiError::not_found("No tenant is configured for this host")
}
