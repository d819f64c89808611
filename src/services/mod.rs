pub mod tenant_migrations;
pub mod tenant_provisioner;
pub mod tenant_resolver;

pub use tenant_migrations::{migrate_all_tenants, MigrationFailure, MigrationReport};
pub use tenant_provisioner::{
    Decommissioned, LifecycleStep, ProvisionError, ProvisionRequest, Provisioned, TenantProvisioner,
};
pub use tenant_resolver::{Candidate, Resolution, ResolveError, ResolverConfigError, TenantResolver};
