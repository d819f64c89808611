use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{AdminSeed, AdminUser, Domain, Site, Tenant, TenantStatus};
use crate::types::Namespace;

/// Physical namespaces inside the shared database.
///
/// Every operation names its namespace explicitly; nothing here depends on
/// whatever `search_path` a pooled connection happened to carry before.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Round trip to the database
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn namespace_exists(&self, namespace: &Namespace) -> Result<bool, DatabaseError>;

    /// Idempotent create
    async fn create_namespace_if_absent(&self, namespace: &Namespace) -> Result<(), DatabaseError>;

    /// Drop the namespace and everything in it. Reserved namespaces are refused.
    async fn drop_namespace(&self, namespace: &Namespace) -> Result<(), DatabaseError>;

    /// Bring the namespace to the current tenant schema version
    async fn run_migrations(&self, namespace: &Namespace) -> Result<(), DatabaseError>;

    /// Insert the administrator inside the namespace, or refresh the existing
    /// row with the same email so a retried provisioning does not fail.
    async fn create_admin(
        &self,
        namespace: &Namespace,
        seed: &AdminSeed,
    ) -> Result<AdminUser, DatabaseError>;

    async fn count_admins(&self, namespace: &Namespace) -> Result<i64, DatabaseError>;
}

/// Hands out request-scoped sessions pinned to one namespace.
///
/// A session owns its connection for the lifetime of the request, so the
/// namespace it was bound to is never observed by any other request.
#[async_trait]
pub trait NamespaceBinder: Send + Sync + 'static {
    type Session: Clone + Send + Sync + 'static;

    async fn bind(&self, namespace: &Namespace) -> Result<Self::Session, DatabaseError>;
}

/// Tenant catalog in the shared namespace
#[async_trait]
pub trait TenantCatalog: Send + Sync {
    /// Any status; callers decide whether the row is routable
    async fn find_by_schema(&self, schema: &Namespace) -> Result<Option<Tenant>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError>;

    /// Insert a new row in `provisioning` status. A taken schema identifier
    /// surfaces as `DatabaseError::UniqueViolation`.
    async fn create(&self, name: &str, schema: &Namespace) -> Result<Tenant, DatabaseError>;

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Tenant, DatabaseError>;

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError>;

    /// Delete the row together with its domains
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Hostname to tenant registry in the shared namespace
#[async_trait]
pub trait DomainRegistry: Send + Sync {
    /// A taken hostname surfaces as `DatabaseError::UniqueViolation`
    async fn create(
        &self,
        hostname: &str,
        tenant: &Tenant,
        is_primary: bool,
    ) -> Result<Domain, DatabaseError>;

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Domain>, DatabaseError>;

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Domain>, DatabaseError>;
}

/// Site directory entries used by code that assumes one global site
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Site>, DatabaseError>;

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, DatabaseError>;

    /// Overwrite an existing entry; `NotFound` if the id is unknown
    async fn update(&self, id: i64, domain: &str, name: &str) -> Result<Site, DatabaseError>;

    async fn upsert_by_domain(&self, domain: &str, name: &str) -> Result<Site, DatabaseError>;

    async fn delete_by_domain(&self, domain: &str) -> Result<bool, DatabaseError>;
}
