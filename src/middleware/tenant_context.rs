use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::database::models::Tenant;
use crate::error::ApiError;
use crate::types::Namespace;

/// Namespace the current request was routed to, inserted by the resolver.
///
/// `tenant` is `None` on the shared namespace.
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    pub host: String,
    pub namespace: Namespace,
    pub tenant: Option<Tenant>,
}

impl TenantContext {
    pub fn is_public(&self) -> bool {
        self.tenant.is_none()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("Handler reached without tenant routing");
                ApiError::internal_server_error("Tenant routing is not configured")
            })
    }
}

/// Extractor for routes that only make sense inside a tenant
#[derive(Debug, Clone)]
pub struct RequiredTenant {
    pub tenant: Tenant,
    pub namespace: Namespace,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequiredTenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = TenantContext::from_request_parts(parts, state).await?;
        match context.tenant {
            Some(tenant) => Ok(RequiredTenant {
                tenant,
                namespace: context.namespace,
            }),
            None => Err(ApiError::forbidden("This endpoint requires a tenant host")),
        }
    }
}

/// Keep tenant administration on the shared namespace's hosts
pub async fn require_public_host(request: Request, next: Next) -> Result<Response, ApiError> {
    let on_tenant = request
        .extensions()
        .get::<TenantContext>()
        .map(|ctx| !ctx.is_public())
        .unwrap_or(true);

    if on_tenant {
        return Err(ApiError::forbidden(
            "Tenant administration is only available on the public host",
        ));
    }
    Ok(next.run(request).await)
}
