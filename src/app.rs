use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::RootAuth;
use crate::database::traits::NamespaceBinder;
use crate::database::Stores;
use crate::handlers::{elevated::root::tenant, protected, public};
use crate::middleware::{require_public_host, require_root, resolve_tenant_middleware, TenantRouting};
use crate::services::TenantProvisioner;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub provisioner: Arc<TenantProvisioner>,
    pub auth: Arc<RootAuth>,
}

/// All routes behind tenant resolution. CORS and tracing layers are added
/// by the server binary.
pub fn router<B: NamespaceBinder>(state: AppState, routing: TenantRouting<B>) -> Router {
    let mut app = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health));

    // An absolute not-found URL points at another service
    if routing.not_found_url.starts_with('/') {
        app = app.route(&routing.not_found_url, get(public::tenant_not_found));
    }

    app.merge(tenant_routes())
        .merge(root_routes(state.auth.clone()))
        .layer(from_fn_with_state(routing, resolve_tenant_middleware::<B>))
        .with_state(state)
}

fn tenant_routes() -> Router<AppState> {
    Router::new().route("/api/tenant", get(protected::tenant_current))
}

/// Tenant administration: public hosts only, then a root JWT
fn root_routes(auth: Arc<RootAuth>) -> Router<AppState> {
    Router::new()
        .route("/api/root/tenant", get(tenant::tenant_list).post(tenant::tenant_create))
        .route(
            "/api/root/tenant/:schema",
            get(tenant::tenant_show).delete(tenant::tenant_delete),
        )
        .route("/api/root/tenant/:schema/domain", post(tenant::tenant_domain_add))
        .route("/api/root/tenant/:schema/health", get(tenant::tenant_health))
        .route_layer(from_fn_with_state(auth, require_root))
        .route_layer(from_fn(require_public_host))
}
