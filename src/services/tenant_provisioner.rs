use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ProvisioningConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{AdminIdentity, AdminSeed, AdminUser, Domain, Site, Tenant, TenantStatus};
use crate::database::Stores;
use crate::types::{normalize_host, Namespace};

/// Longest hostname DNS allows
const MAX_HOSTNAME_LEN: usize = 253;

/// Partial unique index allowing one primary domain per tenant
const PRIMARY_DOMAIN_CONSTRAINT: &str = "domains_one_primary_per_tenant";

/// Stages of the tenant lifecycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    Claim,
    CreateNamespace,
    Migrate,
    SeedAdmin,
    SyncDefaultSite,
    UpsertSite,
    Activate,
    MarkDecommissioning,
    RemoveSites,
    DropNamespace,
    DeleteCatalog,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStep::Claim => "claim",
            LifecycleStep::CreateNamespace => "namespace creation",
            LifecycleStep::Migrate => "migration",
            LifecycleStep::SeedAdmin => "admin seeding",
            LifecycleStep::SyncDefaultSite => "default site update",
            LifecycleStep::UpsertSite => "site registration",
            LifecycleStep::Activate => "activation",
            LifecycleStep::MarkDecommissioning => "decommission marking",
            LifecycleStep::RemoveSites => "site removal",
            LifecycleStep::DropNamespace => "namespace drop",
            LifecycleStep::DeleteCatalog => "catalog removal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid provisioning request: {0}")]
    Validation(String),

    #[error("Tenant already exists: {0}")]
    DuplicateTenant(String),

    #[error("Domain conflict: {0}")]
    DomainConflict(String),

    #[error("Critical error on tenant '{schema}' during {step}: {message}")]
    Failure {
        schema: String,
        step: LifecycleStep,
        message: String,
    },

    #[error("Tenant not found: {0}")]
    NotFound(String),

    #[error("Decommission of '{0}' requires the schema identifier as confirmation")]
    ConfirmationMismatch(String),
}

/// Signup input for a new tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub name: String,
    pub schema: String,
    pub domain: String,
    pub admin: AdminIdentity,
}

/// A fully usable tenant
#[derive(Debug, Clone, Serialize)]
pub struct Provisioned {
    pub tenant_name: String,
    pub domain: String,
    pub tenant: Tenant,
    pub admin: AdminUser,
    pub site: Site,
}

#[derive(Debug, Clone, Serialize)]
pub struct Decommissioned {
    pub tenant: Tenant,
    pub domains: Vec<String>,
    pub sites_removed: usize,
    /// The default site entry pointed at this tenant and was reset
    pub default_site_reset: bool,
}

/// Request fields after validation
#[derive(Debug, Clone)]
struct Plan {
    name: String,
    schema: Namespace,
    domain: String,
    admin: AdminSeed,
}

/// Side effects that compensation has to undo beyond the namespace itself
#[derive(Debug, Default)]
struct Progress {
    default_site_before: Option<Site>,
    upserted_site: Option<Site>,
}

enum StepError {
    Database(DatabaseError),
    TimedOut(Duration),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Database(err) => write!(f, "{}", err),
            StepError::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs_f64()),
        }
    }
}

/// Creates and removes tenants as one unit of work across the namespace,
/// the catalog, the domain registry and the site directory.
///
/// Provisioning claims the catalog and domain rows first, so the storage
/// layer's unique constraints decide races before any namespace is touched.
/// The row only becomes `active` (and therefore routable) after every other
/// step succeeded; any failure after the claim drops the namespace and
/// removes the claim.
pub struct TenantProvisioner {
    stores: Stores,
    settings: ProvisioningConfig,
    shared: Namespace,
}

impl TenantProvisioner {
    pub fn new(stores: Stores, settings: ProvisioningConfig, shared: Namespace) -> Self {
        Self {
            stores,
            settings,
            shared,
        }
    }

    pub async fn provision(&self, request: ProvisionRequest) -> Result<Provisioned, ProvisionError> {
        let plan = self.plan(&request)?;
        info!(
            "Provisioning tenant '{}' in namespace '{}' for {}",
            plan.name, plan.schema, plan.domain
        );

        self.check_leftmost_label(&plan.schema, &plan.domain).await?;
        let tenant = self.claim(&plan).await?;

        let mut progress = Progress::default();
        match self.build(&tenant, &plan, &mut progress).await {
            Ok(provisioned) => {
                info!("Tenant '{}' is live on {}", plan.schema, plan.domain);
                Ok(provisioned)
            }
            Err(err) => {
                warn!("Provisioning of '{}' failed: {}", plan.schema, err);
                self.compensate(&tenant, &plan, &progress).await;
                Err(err)
            }
        }
    }

    /// Inverse of provisioning. `confirmation` must repeat the schema identifier.
    pub async fn decommission(
        &self,
        schema: &str,
        confirmation: &str,
    ) -> Result<Decommissioned, ProvisionError> {
        let schema = self.tenant_schema(schema)?;
        if confirmation.trim().to_ascii_lowercase() != schema.as_str() {
            return Err(ProvisionError::ConfirmationMismatch(schema.to_string()));
        }

        let tenant = self
            .bounded(self.stores.tenants.find_by_schema(&schema))
            .await
            .map_err(|e| failure(&schema, LifecycleStep::MarkDecommissioning, e))?
            .ok_or_else(|| ProvisionError::NotFound(schema.to_string()))?;

        info!("Decommissioning tenant '{}'", schema);

        // Stop routing before anything is removed
        let tenant = self
            .bounded(
                self.stores
                    .tenants
                    .set_status(tenant.id, TenantStatus::Decommissioning),
            )
            .await
            .map_err(|e| failure(&schema, LifecycleStep::MarkDecommissioning, e))?;

        let domains: Vec<String> = self
            .bounded(self.stores.domains.list_for_tenant(tenant.id))
            .await
            .map_err(|e| failure(&schema, LifecycleStep::RemoveSites, e))?
            .into_iter()
            .map(|d| d.domain)
            .collect();

        let mut sites_removed = 0;
        let mut default_site_reset = false;
        for domain in &domains {
            let site = self
                .bounded(self.stores.sites.find_by_domain(domain))
                .await
                .map_err(|e| failure(&schema, LifecycleStep::RemoveSites, e))?;
            match site {
                // The default entry must outlive every tenant
                Some(site) if site.id == self.settings.default_site_id => {
                    self.bounded(self.stores.sites.update(
                        site.id,
                        &self.settings.default_site_domain,
                        &self.settings.default_site_name,
                    ))
                    .await
                    .map_err(|e| failure(&schema, LifecycleStep::RemoveSites, e))?;
                    info!(
                        "Default site {} reset to {}",
                        site.id, self.settings.default_site_domain
                    );
                    default_site_reset = true;
                }
                Some(site) => {
                    let removed = self
                        .bounded(self.stores.sites.delete_by_domain(&site.domain))
                        .await
                        .map_err(|e| failure(&schema, LifecycleStep::RemoveSites, e))?;
                    if removed {
                        sites_removed += 1;
                    }
                }
                None => {}
            }
        }

        self.bounded(self.stores.schemas.drop_namespace(&schema))
            .await
            .map_err(|e| failure(&schema, LifecycleStep::DropNamespace, e))?;

        self.bounded(self.stores.tenants.delete(tenant.id))
            .await
            .map_err(|e| failure(&schema, LifecycleStep::DeleteCatalog, e))?;

        info!(
            "Tenant '{}' decommissioned ({} domains, {} site entries)",
            schema,
            domains.len(),
            sites_removed
        );
        Ok(Decommissioned {
            tenant,
            domains,
            sites_removed,
            default_site_reset,
        })
    }

    /// Route an additional hostname to an existing tenant
    pub async fn add_domain(
        &self,
        schema: &str,
        hostname: &str,
        is_primary: bool,
    ) -> Result<Domain, ProvisionError> {
        let schema = self.tenant_schema(schema)?;
        let hostname = normalize_domain(hostname)?;

        let tenant = self
            .bounded(self.stores.tenants.find_by_schema(&schema))
            .await
            .map_err(|e| failure(&schema, LifecycleStep::Claim, e))?
            .ok_or_else(|| ProvisionError::NotFound(schema.to_string()))?;

        self.check_leftmost_label(&schema, &hostname).await?;

        match self
            .bounded(self.stores.domains.create(&hostname, &tenant, is_primary))
            .await
        {
            Ok(domain) => {
                info!("Domain {} now routes to '{}'", hostname, schema);
                Ok(domain)
            }
            Err(StepError::Database(e)) if e.is_unique_violation() => {
                let message = match e.constraint() {
                    Some(PRIMARY_DOMAIN_CONSTRAINT) => {
                        format!("tenant '{}' already has a primary domain", schema)
                    }
                    _ => format!("domain '{}' is already registered", hostname),
                };
                Err(ProvisionError::DomainConflict(message))
            }
            Err(e) => Err(failure(&schema, LifecycleStep::Claim, e)),
        }
    }

    fn tenant_schema(&self, raw: &str) -> Result<Namespace, ProvisionError> {
        let schema = Namespace::parse_tenant(raw.trim())
            .map_err(|e| ProvisionError::Validation(e.to_string()))?;
        if schema == self.shared {
            return Err(ProvisionError::Validation(format!(
                "schema identifier '{}' is reserved",
                schema
            )));
        }
        Ok(schema)
    }

    /// A hostname whose leftmost label names another tenant would take over
    /// that tenant's label-based routing for the rest of the hostname.
    async fn check_leftmost_label(&self, schema: &Namespace, hostname: &str) -> Result<(), ProvisionError> {
        let label = hostname.split('.').next().unwrap_or_default();
        let named = match Namespace::parse_tenant(label) {
            Ok(named) if named != *schema && named != self.shared => named,
            _ => return Ok(()),
        };

        match self.bounded(self.stores.tenants.find_by_schema(&named)).await {
            Ok(Some(_)) => Err(ProvisionError::DomainConflict(format!(
                "domain '{}' names tenant '{}'",
                hostname, named
            ))),
            Ok(None) => Ok(()),
            Err(e) => Err(failure(schema, LifecycleStep::Claim, e)),
        }
    }

    fn plan(&self, request: &ProvisionRequest) -> Result<Plan, ProvisionError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ProvisionError::Validation("tenant name is required".to_string()));
        }

        let schema = self.tenant_schema(&request.schema)?;
        let domain = normalize_domain(&request.domain)?;
        let admin = request.admin.to_seed().map_err(ProvisionError::Validation)?;

        Ok(Plan {
            name: name.to_string(),
            schema,
            domain,
            admin,
        })
    }

    async fn claim(&self, plan: &Plan) -> Result<Tenant, ProvisionError> {
        let tenant = match self
            .bounded(self.stores.tenants.create(&plan.name, &plan.schema))
            .await
        {
            Ok(tenant) => tenant,
            Err(StepError::Database(e)) if e.is_unique_violation() => {
                return Err(ProvisionError::DuplicateTenant(format!(
                    "schema '{}' is already taken",
                    plan.schema
                )));
            }
            Err(e) => return Err(failure(&plan.schema, LifecycleStep::Claim, e)),
        };

        let registered = self
            .bounded(self.stores.domains.create(&plan.domain, &tenant, true))
            .await;
        if let Err(e) = registered {
            if let Err(cleanup) = self.bounded(self.stores.tenants.delete(tenant.id)).await {
                error!("Failed to release claim on '{}': {}", plan.schema, cleanup);
            }
            return Err(match e {
                StepError::Database(e) if e.is_unique_violation() => ProvisionError::DuplicateTenant(
                    format!("domain '{}' is already registered", plan.domain),
                ),
                other => failure(&plan.schema, LifecycleStep::Claim, other),
            });
        }

        debug!("Claimed '{}' and {}", plan.schema, plan.domain);
        Ok(tenant)
    }

    async fn build(
        &self,
        tenant: &Tenant,
        plan: &Plan,
        progress: &mut Progress,
    ) -> Result<Provisioned, ProvisionError> {
        let schema = &plan.schema;

        self.step(schema, LifecycleStep::CreateNamespace, self.stores.schemas.create_namespace_if_absent(schema))
            .await?;

        self.step(schema, LifecycleStep::Migrate, self.stores.schemas.run_migrations(schema))
            .await?;

        let admin = self
            .step(schema, LifecycleStep::SeedAdmin, self.stores.schemas.create_admin(schema, &plan.admin))
            .await?;

        if self.settings.sync_default_site {
            let id = self.settings.default_site_id;
            let previous = self
                .step(schema, LifecycleStep::SyncDefaultSite, self.stores.sites.get(id))
                .await?
                .ok_or_else(|| ProvisionError::Failure {
                    schema: schema.to_string(),
                    step: LifecycleStep::SyncDefaultSite,
                    message: format!("default site {} does not exist", id),
                })?;
            self.step(
                schema,
                LifecycleStep::SyncDefaultSite,
                self.stores.sites.update(id, &plan.domain, &plan.name),
            )
            .await?;
            progress.default_site_before = Some(previous);
        }

        let site = self
            .step(
                schema,
                LifecycleStep::UpsertSite,
                self.stores.sites.upsert_by_domain(&plan.domain, &plan.name),
            )
            .await?;
        progress.upserted_site = Some(site.clone());

        let tenant = self
            .step(
                schema,
                LifecycleStep::Activate,
                self.stores.tenants.set_status(tenant.id, TenantStatus::Active),
            )
            .await?;

        Ok(Provisioned {
            tenant_name: tenant.name.clone(),
            domain: plan.domain.clone(),
            tenant,
            admin,
            site,
        })
    }

    /// Undo everything after the claim, newest first. Errors are logged, not
    /// returned: the caller already has the original failure.
    async fn compensate(&self, tenant: &Tenant, plan: &Plan, progress: &Progress) {
        warn!("Rolling back tenant '{}'", plan.schema);

        if let Some(previous) = &progress.default_site_before {
            if let Err(e) = self
                .bounded(self.stores.sites.update(previous.id, &previous.domain, &previous.name))
                .await
            {
                error!("Failed to restore default site {}: {}", previous.id, e);
            }
        }

        if let Some(site) = &progress.upserted_site {
            if site.id != self.settings.default_site_id {
                if let Err(e) = self.bounded(self.stores.sites.delete_by_domain(&plan.domain)).await {
                    error!("Failed to remove site entry {}: {}", plan.domain, e);
                }
            }
        }

        if let Err(e) = self.bounded(self.stores.schemas.drop_namespace(&plan.schema)).await {
            error!("Failed to drop namespace '{}': {}", plan.schema, e);
        }

        if let Err(e) = self.bounded(self.stores.tenants.delete(tenant.id)).await {
            error!("Failed to remove catalog row for '{}': {}", plan.schema, e);
        }
    }

    async fn step<T, F>(
        &self,
        schema: &Namespace,
        step: LifecycleStep,
        fut: F,
    ) -> Result<T, ProvisionError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        debug!("'{}': {}", schema, step);
        self.bounded(fut).await.map_err(|e| failure(schema, step, e))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StepError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        let limit = self.settings.step_timeout();
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(StepError::Database),
            Err(_) => Err(StepError::TimedOut(limit)),
        }
    }
}

fn failure(schema: &Namespace, step: LifecycleStep, err: StepError) -> ProvisionError {
    ProvisionError::Failure {
        schema: schema.to_string(),
        step,
        message: err.to_string(),
    }
}

/// Lowercased hostname without port. Labels hold letters, digits, hyphens and
/// underscores, since the leftmost label doubles as the schema identifier.
pub fn normalize_domain(raw: &str) -> Result<String, ProvisionError> {
    let domain = normalize_host(raw);
    let invalid = || ProvisionError::Validation(format!("'{}' is not a valid domain", raw.trim()));

    if domain.is_empty() || domain.len() > MAX_HOSTNAME_LEN {
        return Err(invalid());
    }
    let labels_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });
    if !labels_ok {
        return Err(invalid());
    }
    Ok(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;
    use std::sync::Arc;

    fn provisioner(backend: &Arc<MemoryBackend>) -> TenantProvisioner {
        provisioner_with(backend, ProvisioningConfig::default())
    }

    fn provisioner_with(backend: &Arc<MemoryBackend>, settings: ProvisioningConfig) -> TenantProvisioner {
        TenantProvisioner::new(backend.stores(), settings, Namespace::public())
    }

    fn acme() -> ProvisionRequest {
        ProvisionRequest {
            name: "Acme".into(),
            schema: "acme".into(),
            domain: "acme.example.com".into(),
            admin: AdminIdentity {
                username: Some("alice".into()),
                email: Some("a@acme.com".into()),
                password_hash: None,
            },
        }
    }

    fn ns(s: &str) -> Namespace {
        Namespace::parse(s).unwrap()
    }

    #[tokio::test]
    async fn provisions_a_new_tenant() {
        let backend = MemoryBackend::new();
        let provisioned = provisioner(&backend).provision(acme()).await.unwrap();

        assert_eq!(provisioned.tenant_name, "Acme");
        assert_eq!(provisioned.domain, "acme.example.com");
        assert!(provisioned.tenant.is_active());

        assert!(backend.namespace_present(&ns("acme")));
        assert!(backend.is_migrated(&ns("acme")));
        let admins = backend.admins(&ns("acme"));
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, "a@acme.com");
        assert_eq!(admins[0].role, "admin");
        assert!(admins[0].is_active);

        assert!(backend.site_for("acme.example.com").is_some());
        let domains = backend.domains_of("acme");
        assert_eq!(domains.len(), 1);
        assert!(domains[0].is_primary);
    }

    #[tokio::test]
    async fn default_site_is_left_alone_unless_enabled() {
        let backend = MemoryBackend::new();
        provisioner(&backend).provision(acme()).await.unwrap();

        let default = backend.site(1).unwrap();
        assert_eq!(default.domain, "example.com");
    }

    #[tokio::test]
    async fn default_site_follows_new_tenant_when_enabled() {
        let backend = MemoryBackend::new();
        let settings = ProvisioningConfig {
            sync_default_site: true,
            ..ProvisioningConfig::default()
        };
        let provisioned = provisioner_with(&backend, settings)
            .provision(acme())
            .await
            .unwrap();

        let default = backend.site(1).unwrap();
        assert_eq!(default.domain, "acme.example.com");
        assert_eq!(default.name, "Acme");
        // the per-domain upsert lands on the rewritten default entry
        assert_eq!(provisioned.site.id, 1);
    }

    #[tokio::test]
    async fn migration_failure_leaves_no_trace() {
        let backend = MemoryBackend::new();
        backend.fail_on("run_migrations");

        let err = provisioner(&backend).provision(acme()).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Failure { step: LifecycleStep::Migrate, .. }
        ));

        assert!(!backend.namespace_present(&ns("acme")));
        assert!(backend.admins(&ns("acme")).is_empty());
        assert!(backend.site_for("acme.example.com").is_none());
        assert!(backend.tenant("acme").is_none());
        assert!(backend.domains_of("acme").is_empty());
        assert_eq!(backend.calls("drop_namespace"), 1);
    }

    #[tokio::test]
    async fn late_failure_restores_directory() {
        let backend = MemoryBackend::new();
        backend.fail_on("set_status");
        let settings = ProvisioningConfig {
            sync_default_site: true,
            ..ProvisioningConfig::default()
        };

        let err = provisioner_with(&backend, settings)
            .provision(acme())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Failure { step: LifecycleStep::Activate, .. }
        ));

        let default = backend.site(1).unwrap();
        assert_eq!(default.domain, "example.com");
        assert!(backend.site_for("acme.example.com").is_none());
        assert!(!backend.namespace_present(&ns("acme")));
        assert!(backend.tenant("acme").is_none());
    }

    #[tokio::test]
    async fn missing_email_creates_nothing() {
        let backend = MemoryBackend::new();
        let mut request = acme();
        request.admin.email = None;

        let err = provisioner(&backend).provision(request).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Validation(_)));
        assert_eq!(backend.calls("create_namespace_if_absent"), 0);
        assert_eq!(backend.calls("create_tenant"), 0);
        assert!(!backend.namespace_present(&ns("acme")));
    }

    #[tokio::test]
    async fn rejects_reserved_and_malformed_input() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);

        for schema in ["public", "pg_toast", "ac-me", ""] {
            let mut request = acme();
            request.schema = schema.into();
            assert!(
                matches!(provisioner.provision(request).await, Err(ProvisionError::Validation(_))),
                "{schema}"
            );
        }

        for domain in ["", "acme..example.com", "-acme.example.com", "acme!.example.com"] {
            let mut request = acme();
            request.domain = domain.into();
            assert!(
                matches!(provisioner.provision(request).await, Err(ProvisionError::Validation(_))),
                "{domain}"
            );
        }

        let mut request = acme();
        request.name = "  ".into();
        assert!(matches!(provisioner.provision(request).await, Err(ProvisionError::Validation(_))));

        assert_eq!(backend.calls("create_tenant"), 0);
    }

    #[tokio::test]
    async fn concurrent_duplicate_schema_has_one_winner() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);

        let mut first = acme();
        first.schema = "dup".into();
        first.domain = "dup.example.com".into();
        let mut second = first.clone();
        second.name = "Dup Two".into();
        second.domain = "dup2.example.com".into();

        let (a, b) = tokio::join!(provisioner.provision(first), provisioner.provision(second));

        let outcomes = [a.is_ok(), b.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let loser = if a.is_ok() { b.unwrap_err() } else { a.unwrap_err() };
        assert!(matches!(loser, ProvisionError::DuplicateTenant(_)));

        // the winner's namespace survives; nothing was dropped
        assert!(backend.namespace_present(&ns("dup")));
        assert_eq!(backend.calls("drop_namespace"), 0);
        assert_eq!(backend.admins(&ns("dup")).len(), 1);
        assert!(backend.tenant("dup").unwrap().is_active());
    }

    #[tokio::test]
    async fn duplicate_domain_releases_claim() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);
        provisioner.provision(acme()).await.unwrap();
        provisioner.add_domain("acme", "shop.example.com", false).await.unwrap();

        let mut other = acme();
        other.name = "Other".into();
        other.schema = "other".into();
        other.domain = "shop.example.com".into();

        let err = provisioner.provision(other).await.unwrap_err();
        assert!(matches!(err, ProvisionError::DuplicateTenant(_)));
        assert!(backend.tenant("other").is_none());
        assert!(!backend.namespace_present(&ns("other")));
    }

    #[tokio::test]
    async fn retry_over_orphan_namespace_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.insert_orphan_namespace(&ns("acme"), "a@acme.com");

        let provisioned = provisioner(&backend).provision(acme()).await.unwrap();
        assert_eq!(provisioned.admin.username, "alice");

        let admins = backend.admins(&ns("acme"));
        assert_eq!(admins.len(), 1);
        assert!(admins[0].is_active);
    }

    #[tokio::test]
    async fn slow_migration_times_out_and_rolls_back() {
        let backend = MemoryBackend::new();
        backend.delay_on("run_migrations", Duration::from_secs(3));
        let settings = ProvisioningConfig {
            step_timeout_secs: 1,
            ..ProvisioningConfig::default()
        };

        let err = provisioner_with(&backend, settings)
            .provision(acme())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(!backend.namespace_present(&ns("acme")));
        assert!(backend.tenant("acme").is_none());
    }

    #[tokio::test]
    async fn decommission_requires_confirmation() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);
        provisioner.provision(acme()).await.unwrap();

        let err = provisioner.decommission("acme", "beta").await.unwrap_err();
        assert!(matches!(err, ProvisionError::ConfirmationMismatch(_)));
        assert!(backend.namespace_present(&ns("acme")));
        assert!(backend.tenant("acme").unwrap().is_active());
    }

    #[tokio::test]
    async fn decommission_removes_every_trace() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);
        provisioner.provision(acme()).await.unwrap();
        provisioner
            .add_domain("acme", "shop.acme.io", false)
            .await
            .unwrap();

        let gone = provisioner.decommission("acme", "acme").await.unwrap();
        assert_eq!(gone.domains.len(), 2);
        assert_eq!(gone.sites_removed, 1);
        assert_eq!(gone.tenant.status, TenantStatus::Decommissioning);

        assert!(!backend.namespace_present(&ns("acme")));
        assert!(backend.tenant("acme").is_none());
        assert!(backend.domains_of("acme").is_empty());
        assert!(backend.site_for("acme.example.com").is_none());

        assert!(matches!(
            provisioner.decommission("acme", "acme").await,
            Err(ProvisionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_decommission_keeps_tenant_unroutable() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);
        provisioner.provision(acme()).await.unwrap();
        backend.fail_on("drop_namespace");

        let err = provisioner.decommission("acme", "acme").await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Failure { step: LifecycleStep::DropNamespace, .. }
        ));
        assert_eq!(
            backend.tenant("acme").unwrap().status,
            TenantStatus::Decommissioning
        );
    }

    #[tokio::test]
    async fn add_domain_rejects_taken_hostnames() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);
        provisioner.provision(acme()).await.unwrap();

        let err = provisioner
            .add_domain("acme", "ACME.example.com:8000", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::DomainConflict(ref m) if m.contains("already registered")));

        let err = provisioner
            .add_domain("acme", "www.acme.io", true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::DomainConflict(ref m) if m.contains("primary domain")), "{err}");

        assert!(matches!(
            provisioner.add_domain("ghost", "ghost.example.com", false).await,
            Err(ProvisionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn domains_naming_another_tenant_are_refused() {
        let backend = MemoryBackend::new();
        let provisioner = provisioner(&backend);
        provisioner.provision(acme()).await.unwrap();

        let mut beta = acme();
        beta.name = "Beta".into();
        beta.schema = "beta".into();
        beta.domain = "beta.example.com".into();
        provisioner.provision(beta).await.unwrap();

        let err = provisioner
            .add_domain("acme", "beta.acme-shop.io", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::DomainConflict(_)), "{err}");
        assert_eq!(backend.domains_of("acme").len(), 1);

        let mut gamma = acme();
        gamma.name = "Gamma".into();
        gamma.schema = "gamma".into();
        gamma.domain = "acme.gamma.io".into();
        let err = provisioner.provision(gamma).await.unwrap_err();
        assert!(matches!(err, ProvisionError::DomainConflict(_)), "{err}");
        assert!(backend.tenant("gamma").is_none());

        // any other custom hostname is fine
        provisioner.add_domain("acme", "shop.acme.io", false).await.unwrap();
        assert_eq!(backend.domains_of("acme").len(), 2);
    }

    #[tokio::test]
    async fn decommission_keeps_the_default_site_entry() {
        let backend = MemoryBackend::new();
        let settings = ProvisioningConfig {
            sync_default_site: true,
            ..ProvisioningConfig::default()
        };
        let provisioner = provisioner_with(&backend, settings);
        provisioner.provision(acme()).await.unwrap();
        assert_eq!(backend.site(1).unwrap().domain, "acme.example.com");

        let gone = provisioner.decommission("acme", "acme").await.unwrap();
        assert!(gone.default_site_reset);
        assert_eq!(gone.sites_removed, 0);
        assert_eq!(backend.site(1).unwrap().domain, "example.com");

        let mut beta = acme();
        beta.name = "Beta".into();
        beta.schema = "beta".into();
        beta.domain = "beta.example.com".into();
        provisioner.provision(beta).await.unwrap();
        assert_eq!(backend.site(1).unwrap().domain, "beta.example.com");
    }

    #[tokio::test]
    async fn hung_compensation_is_bounded() {
        let backend = MemoryBackend::new();
        backend.fail_on("run_migrations");
        backend.delay_on("drop_namespace", Duration::from_secs(60));
        let settings = ProvisioningConfig {
            step_timeout_secs: 1,
            ..ProvisioningConfig::default()
        };
        let provisioner = provisioner_with(&backend, settings);

        let outcome = tokio::time::timeout(Duration::from_secs(10), provisioner.provision(acme()))
            .await
            .expect("rollback should not wait on a hung drop");
        assert!(matches!(
            outcome,
            Err(ProvisionError::Failure { step: LifecycleStep::Migrate, .. })
        ));
        // later compensation steps still ran
        assert!(backend.tenant("acme").is_none());
    }

    #[test]
    fn normalizes_domains() {
        assert_eq!(normalize_domain("Acme.Example.com:8000").unwrap(), "acme.example.com");
        assert_eq!(normalize_domain("acme.localhost").unwrap(), "acme.localhost");
        assert_eq!(normalize_domain("big_co.example.com").unwrap(), "big_co.example.com");
        assert!(normalize_domain("acme .example.com").is_err());
    }
}
