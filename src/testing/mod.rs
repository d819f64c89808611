//! In-memory stand-ins for the storage seams, with call counting and
//! failure injection for unit tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{AdminSeed, AdminUser, Domain, Site, Tenant, TenantStatus, ADMIN_ROLE};
use crate::database::traits::{DomainRegistry, NamespaceBinder, SchemaStore, SiteDirectory, TenantCatalog};
use crate::database::Stores;
use crate::types::Namespace;

#[derive(Default)]
struct NamespaceState {
    migrated: bool,
    users: Vec<AdminUser>,
}

#[derive(Default)]
struct State {
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
    delays: HashMap<&'static str, Duration>,
    namespaces: HashMap<String, NamespaceState>,
    tenants: Vec<Tenant>,
    domains: Vec<(Domain, String)>,
    sites: Vec<Site>,
    bound: Vec<Namespace>,
    next_id: i64,
}

/// Session handed out by [`MemoryBackend`]'s binder
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySession {
    pub namespace: Namespace,
}

pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Starts with the shared namespace and the default site entry
    pub fn new() -> Arc<Self> {
        let mut state = State {
            next_id: 100,
            ..State::default()
        };
        state.namespaces.insert(
            "public".to_string(),
            NamespaceState {
                migrated: true,
                users: Vec::new(),
            },
        );
        state.sites.push(Site {
            id: 1,
            domain: "example.com".to_string(),
            name: "Example".to_string(),
        });
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            schemas: self.clone(),
            tenants: self.clone(),
            domains: self.clone(),
            sites: self.clone(),
        }
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn fail_on(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn delay_on(&self, op: &'static str, delay: Duration) {
        self.state.lock().unwrap().delays.insert(op, delay);
    }

    pub fn insert_tenant(&self, name: &str, schema: &str, status: TenantStatus) -> Tenant {
        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            schema_name: Namespace::parse(schema).unwrap(),
            status,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().unwrap();
        state.namespaces.entry(schema.to_string()).or_default().migrated = true;
        state.tenants.push(tenant.clone());
        tenant
    }

    pub fn insert_domain(&self, hostname: &str, tenant: &Tenant) -> Domain {
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let domain = Domain {
            id: Self::next_id(&mut state),
            domain: hostname.to_string(),
            tenant_id: tenant.id,
            is_primary: false,
            created_at: now,
            updated_at: now,
        };
        state
            .domains
            .push((domain.clone(), tenant.schema_name.to_string()));
        domain
    }

    /// A namespace left behind by an interrupted run, already holding the admin
    pub fn insert_orphan_namespace(&self, namespace: &Namespace, email: &str) {
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let ns = state.namespaces.entry(namespace.to_string()).or_default();
        ns.migrated = true;
        ns.users.push(AdminUser {
            id: 1,
            username: "stale".to_string(),
            email: email.to_string(),
            role: ADMIN_ROLE.to_string(),
            is_active: false,
            created_at: now,
            updated_at: now,
        });
    }

    pub fn namespace_present(&self, namespace: &Namespace) -> bool {
        self.state.lock().unwrap().namespaces.contains_key(namespace.as_str())
    }

    pub fn is_migrated(&self, namespace: &Namespace) -> bool {
        self.state
            .lock()
            .unwrap()
            .namespaces
            .get(namespace.as_str())
            .map(|ns| ns.migrated)
            .unwrap_or(false)
    }

    pub fn admins(&self, namespace: &Namespace) -> Vec<AdminUser> {
        self.state
            .lock()
            .unwrap()
            .namespaces
            .get(namespace.as_str())
            .map(|ns| ns.users.clone())
            .unwrap_or_default()
    }

    pub fn tenant(&self, schema: &str) -> Option<Tenant> {
        let state = self.state.lock().unwrap();
        state
            .tenants
            .iter()
            .find(|t| t.schema_name.as_str() == schema)
            .cloned()
    }

    pub fn domains_of(&self, schema: &str) -> Vec<Domain> {
        let state = self.state.lock().unwrap();
        state
            .domains
            .iter()
            .filter(|(_, owner)| owner == schema)
            .map(|(d, _)| d.clone())
            .collect()
    }

    pub fn site(&self, id: i64) -> Option<Site> {
        self.state.lock().unwrap().sites.iter().find(|s| s.id == id).cloned()
    }

    pub fn site_for(&self, domain: &str) -> Option<Site> {
        self.state
            .lock()
            .unwrap()
            .sites
            .iter()
            .find(|s| s.domain == domain)
            .cloned()
    }

    /// Namespaces bound by request sessions, in order
    pub fn bound(&self) -> Vec<Namespace> {
        self.state.lock().unwrap().bound.clone()
    }

    async fn enter(&self, op: &'static str) -> Result<(), DatabaseError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(op).or_insert(0) += 1;
            state.delays.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        tokio::task::yield_now().await;
        if self.state.lock().unwrap().failing.contains(op) {
            return Err(DatabaseError::QueryError(format!("injected failure in {op}")));
        }
        Ok(())
    }

    fn next_id(state: &mut State) -> i64 {
        state.next_id += 1;
        state.next_id
    }
}

fn unique(constraint: &str) -> DatabaseError {
    DatabaseError::UniqueViolation {
        constraint: Some(constraint.to_string()),
    }
}

#[async_trait]
impl SchemaStore for MemoryBackend {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.enter("ping").await
    }

    async fn namespace_exists(&self, namespace: &Namespace) -> Result<bool, DatabaseError> {
        self.enter("namespace_exists").await?;
        Ok(self.namespace_present(namespace))
    }

    async fn create_namespace_if_absent(&self, namespace: &Namespace) -> Result<(), DatabaseError> {
        self.enter("create_namespace_if_absent").await?;
        let mut state = self.state.lock().unwrap();
        state.namespaces.entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<(), DatabaseError> {
        self.enter("drop_namespace").await?;
        if namespace.is_reserved() {
            return Err(DatabaseError::ReservedNamespace(namespace.to_string()));
        }
        self.state.lock().unwrap().namespaces.remove(namespace.as_str());
        Ok(())
    }

    async fn run_migrations(&self, namespace: &Namespace) -> Result<(), DatabaseError> {
        self.enter("run_migrations").await?;
        let mut state = self.state.lock().unwrap();
        let ns = state
            .namespaces
            .get_mut(namespace.as_str())
            .ok_or_else(|| DatabaseError::NotFound(namespace.to_string()))?;
        ns.migrated = true;
        Ok(())
    }

    async fn create_admin(
        &self,
        namespace: &Namespace,
        seed: &AdminSeed,
    ) -> Result<AdminUser, DatabaseError> {
        self.enter("create_admin").await?;
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let id = Self::next_id(&mut state);
        let ns = state
            .namespaces
            .get_mut(namespace.as_str())
            .filter(|ns| ns.migrated)
            .ok_or_else(|| DatabaseError::QueryError("relation \"users\" does not exist".into()))?;

        if let Some(user) = ns.users.iter_mut().find(|u| u.email == seed.email) {
            user.username = seed.username.clone();
            user.role = ADMIN_ROLE.to_string();
            user.is_active = true;
            user.updated_at = now;
            return Ok(user.clone());
        }

        let user = AdminUser {
            id,
            username: seed.username.clone(),
            email: seed.email.clone(),
            role: ADMIN_ROLE.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        ns.users.push(user.clone());
        Ok(user)
    }

    async fn count_admins(&self, namespace: &Namespace) -> Result<i64, DatabaseError> {
        self.enter("count_admins").await?;
        Ok(self
            .admins(namespace)
            .iter()
            .filter(|u| u.role == ADMIN_ROLE)
            .count() as i64)
    }
}

#[async_trait]
impl NamespaceBinder for MemoryBackend {
    type Session = MemorySession;

    async fn bind(&self, namespace: &Namespace) -> Result<MemorySession, DatabaseError> {
        self.enter("bind").await?;
        self.state.lock().unwrap().bound.push(namespace.clone());
        Ok(MemorySession {
            namespace: namespace.clone(),
        })
    }
}

#[async_trait]
impl TenantCatalog for MemoryBackend {
    async fn find_by_schema(&self, schema: &Namespace) -> Result<Option<Tenant>, DatabaseError> {
        self.enter("find_by_schema").await?;
        Ok(self.tenant(schema.as_str()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        self.enter("find_by_id").await?;
        let state = self.state.lock().unwrap();
        Ok(state.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, name: &str, schema: &Namespace) -> Result<Tenant, DatabaseError> {
        self.enter("create_tenant").await?;
        let mut state = self.state.lock().unwrap();
        if state.tenants.iter().any(|t| &t.schema_name == schema) {
            return Err(unique("tenants_schema_name_key"));
        }
        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            schema_name: schema.clone(),
            status: TenantStatus::Provisioning,
            created_at: now,
            updated_at: now,
        };
        state.tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Tenant, DatabaseError> {
        self.enter("set_status").await?;
        let mut state = self.state.lock().unwrap();
        let tenant = state
            .tenants
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("tenant {id}")))?;
        tenant.status = status;
        tenant.updated_at = Utc::now();
        Ok(tenant.clone())
    }

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError> {
        self.enter("list_tenants").await?;
        Ok(self.state.lock().unwrap().tenants.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.enter("delete_tenant").await?;
        let mut state = self.state.lock().unwrap();
        let before = state.tenants.len();
        state.tenants.retain(|t| t.id != id);
        state.domains.retain(|(d, _)| d.tenant_id != id);
        Ok(state.tenants.len() < before)
    }
}

#[async_trait]
impl DomainRegistry for MemoryBackend {
    async fn create(
        &self,
        hostname: &str,
        tenant: &Tenant,
        is_primary: bool,
    ) -> Result<Domain, DatabaseError> {
        self.enter("create_domain").await?;
        let mut state = self.state.lock().unwrap();
        if state.domains.iter().any(|(d, _)| d.domain == hostname) {
            return Err(unique("domains_domain_key"));
        }
        if is_primary
            && state
                .domains
                .iter()
                .any(|(d, _)| d.tenant_id == tenant.id && d.is_primary)
        {
            return Err(unique("domains_one_primary_per_tenant"));
        }
        let now = Utc::now();
        let domain = Domain {
            id: Self::next_id(&mut state),
            domain: hostname.to_string(),
            tenant_id: tenant.id,
            is_primary,
            created_at: now,
            updated_at: now,
        };
        state
            .domains
            .push((domain.clone(), tenant.schema_name.to_string()));
        Ok(domain)
    }

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Domain>, DatabaseError> {
        self.enter("find_by_hostname").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .domains
            .iter()
            .find(|(d, _)| d.domain == hostname)
            .map(|(d, _)| d.clone()))
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Domain>, DatabaseError> {
        self.enter("list_domains").await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .domains
            .iter()
            .filter(|(d, _)| d.tenant_id == tenant_id)
            .map(|(d, _)| d.clone())
            .collect())
    }
}

#[async_trait]
impl SiteDirectory for MemoryBackend {
    async fn get(&self, id: i64) -> Result<Option<Site>, DatabaseError> {
        self.enter("get_site").await?;
        Ok(self.site(id))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, DatabaseError> {
        self.enter("find_site").await?;
        Ok(self.site_for(domain))
    }

    async fn update(&self, id: i64, domain: &str, name: &str) -> Result<Site, DatabaseError> {
        self.enter("update_site").await?;
        let mut state = self.state.lock().unwrap();
        if state.sites.iter().any(|s| s.id != id && s.domain == domain) {
            return Err(unique("sites_domain_key"));
        }
        let site = state
            .sites
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("site {id}")))?;
        site.domain = domain.to_string();
        site.name = name.to_string();
        Ok(site.clone())
    }

    async fn upsert_by_domain(&self, domain: &str, name: &str) -> Result<Site, DatabaseError> {
        self.enter("upsert_site").await?;
        let mut state = self.state.lock().unwrap();
        if let Some(site) = state.sites.iter_mut().find(|s| s.domain == domain) {
            site.name = name.to_string();
            return Ok(site.clone());
        }
        let site = Site {
            id: Self::next_id(&mut state),
            domain: domain.to_string(),
            name: name.to_string(),
        };
        state.sites.push(site.clone());
        Ok(site)
    }

    async fn delete_by_domain(&self, domain: &str) -> Result<bool, DatabaseError> {
        self.enter("delete_site").await?;
        let mut state = self.state.lock().unwrap();
        let before = state.sites.len();
        state.sites.retain(|s| s.domain != domain);
        Ok(state.sites.len() < before)
    }
}
