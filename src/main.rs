use anyhow::Context;
use axum::http::HeaderValue;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use tenant_gate::app::{router, AppState};
use tenant_gate::auth::RootAuth;
use tenant_gate::config::{config, AppConfig};
use tenant_gate::database::{DatabaseManager, PgSchemaStore, Stores};
use tenant_gate::middleware::TenantRouting;
use tenant_gate::services::{TenantProvisioner, TenantResolver};
use tenant_gate::telemetry::init_tracing;
use tenant_gate::types::Namespace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, TENANT_*, etc.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    info!("Starting tenant-gate in {:?} mode", config.environment);

    let public = Namespace::parse(&config.tenancy.public_schema)
        .context("TENANT_PUBLIC_SCHEMA is not a valid schema name")?;
    let pool = DatabaseManager::connect_lazy(&config.database)?;

    // The server still answers /health with the database down
    if let Err(e) = DatabaseManager::migrate_public(&pool, &public).await {
        warn!("Shared namespace migrations not applied: {}", e);
    }

    let stores = Stores::postgres(&pool, &public);
    let resolver = TenantResolver::new(&config.tenancy, stores.tenants.clone(), stores.domains.clone())?;
    let routing = TenantRouting::new(
        Arc::new(resolver),
        Arc::new(PgSchemaStore::new(pool.clone())),
        config.tenancy.not_found_url.as_str(),
    );
    let provisioner = TenantProvisioner::new(stores.clone(), config.provisioning.clone(), public);

    if config.security.jwt_secret.is_empty() {
        warn!("JWT_SECRET is not set; tenant administration over HTTP is disabled");
    }
    let auth = RootAuth::new(&config.security.jwt_secret, config.security.jwt_expiry_hours);

    let app = router(
        AppState {
            stores,
            provisioner: Arc::new(provisioner),
            auth: Arc::new(auth),
        },
        routing,
    )
    .layer(cors(config))
    .layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("tenant-gate listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}
