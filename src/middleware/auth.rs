use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::auth::{AuthError, RootAuth};
use crate::error::ApiError;

/// Operator behind a verified root token
#[derive(Clone, Debug)]
pub struct RootUser {
    pub subject: String,
}

/// Admits only requests carrying a valid root JWT and injects [`RootUser`]
pub async fn require_root(
    State(auth): State<Arc<RootAuth>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = extract_jwt_from_headers(&headers)
        .and_then(|token| auth.verify(token))
        .map_err(|e| {
            warn!("Tenant administration refused on {}: {}", request.uri().path(), e);
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(RootUser { subject: claims.sub });
    Ok(next.run(request).await)
}

fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedHeader),
    }
}
