pub mod catalog;
pub mod manager;
pub mod models;
pub mod schema_store;
pub mod sites;
pub mod traits;

pub use catalog::{PgDomainRegistry, PgTenantCatalog};
pub use manager::{DatabaseError, DatabaseManager};
pub use schema_store::{PgSchemaStore, PgSession};
pub use sites::PgSiteDirectory;
pub use traits::{DomainRegistry, NamespaceBinder, SchemaStore, SiteDirectory, TenantCatalog};

use sqlx::PgPool;
use std::sync::Arc;

use crate::types::Namespace;

/// The storage seams provisioning works through
#[derive(Clone)]
pub struct Stores {
    pub schemas: Arc<dyn SchemaStore>,
    pub tenants: Arc<dyn TenantCatalog>,
    pub domains: Arc<dyn DomainRegistry>,
    pub sites: Arc<dyn SiteDirectory>,
}

impl Stores {
    /// Postgres-backed stores; shared tables live in `shared`
    pub fn postgres(pool: &PgPool, shared: &Namespace) -> Self {
        Self {
            schemas: Arc::new(PgSchemaStore::new(pool.clone())),
            tenants: Arc::new(PgTenantCatalog::new(pool.clone(), shared)),
            domains: Arc::new(PgDomainRegistry::new(pool.clone(), shared)),
            sites: Arc::new(PgSiteDirectory::new(pool.clone(), shared)),
        }
    }
}
