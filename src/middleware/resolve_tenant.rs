use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::tenant_context::TenantContext;
use crate::database::traits::NamespaceBinder;
use crate::error::ApiError;
use crate::services::{ResolveError, TenantResolver};

/// State for [`resolve_tenant_middleware`]
pub struct TenantRouting<B> {
    pub resolver: Arc<TenantResolver>,
    pub binder: Arc<B>,
    pub not_found_url: Arc<str>,
}

impl<B> Clone for TenantRouting<B> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            binder: self.binder.clone(),
            not_found_url: self.not_found_url.clone(),
        }
    }
}

impl<B: NamespaceBinder> TenantRouting<B> {
    pub fn new(resolver: Arc<TenantResolver>, binder: Arc<B>, not_found_url: impl Into<Arc<str>>) -> Self {
        Self {
            resolver,
            binder,
            not_found_url: not_found_url.into(),
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        path == "/health" || path == &*self.not_found_url
    }
}

/// Route every request to the namespace named by its host.
///
/// On success the request carries a [`TenantContext`] and a session of the
/// binder's type, pinned to the resolved namespace (the shared one included).
/// Unknown tenants are redirected to the not-found page and bad identifiers
/// are answered with 400; in neither case is a namespace bound.
pub async fn resolve_tenant_middleware<B: NamespaceBinder>(
    State(routing): State<TenantRouting<B>>,
    mut request: Request,
    next: Next,
) -> Response {
    if routing.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let raw_host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_string();

    let resolution = match routing.resolver.resolve(&raw_host).await {
        Ok(resolution) => resolution,
        Err(ResolveError::TenantNotFound(schema)) => {
            debug!("No tenant '{}', redirecting to {}", schema, routing.not_found_url);
            return (
                StatusCode::FOUND,
                [(header::LOCATION, routing.not_found_url.to_string())],
            )
                .into_response();
        }
        Err(err) => {
            if let ResolveError::InvalidSchemaIdentifier(label) = &err {
                warn!("Rejected host '{}': invalid schema identifier '{}'", raw_host, label);
            }
            return ApiError::from(err).into_response();
        }
    };

    let session = match routing.binder.bind(&resolution.namespace).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to bind namespace '{}': {}", resolution.namespace, e);
            return ApiError::service_unavailable("Tenant namespace unavailable").into_response();
        }
    };

    request.extensions_mut().insert(TenantContext {
        host: resolution.host,
        namespace: resolution.namespace,
        tenant: resolution.tenant,
    });
    request.extensions_mut().insert(session);

    next.run(request).await
}
