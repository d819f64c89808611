pub mod migrate;
pub mod tenant;
pub mod token;

use anyhow::Context;
use sqlx::PgPool;

use crate::config::config;
use crate::database::{DatabaseManager, Stores};
use crate::services::TenantProvisioner;
use crate::types::Namespace;

/// Database handles shared by the commands
pub struct Backend {
    pub pool: PgPool,
    pub public: Namespace,
    pub stores: Stores,
}

impl Backend {
    pub fn connect() -> anyhow::Result<Self> {
        let config = config();
        let public = Namespace::parse(&config.tenancy.public_schema)
            .context("TENANT_PUBLIC_SCHEMA is not a valid schema name")?;
        let pool = DatabaseManager::connect_lazy(&config.database)?;
        let stores = Stores::postgres(&pool, &public);
        Ok(Self { pool, public, stores })
    }

    pub fn provisioner(&self) -> TenantProvisioner {
        TenantProvisioner::new(
            self.stores.clone(),
            config().provisioning.clone(),
            self.public.clone(),
        )
    }
}
