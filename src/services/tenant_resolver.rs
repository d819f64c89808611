use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TenancyConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::Tenant;
use crate::database::traits::{DomainRegistry, TenantCatalog};
use crate::types::{is_ip_literal, normalize_host, Namespace, NamespaceError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Request has no host")]
    MissingHost,

    #[error("Invalid schema identifier: {0}")]
    InvalidSchemaIdentifier(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Error)]
pub enum ResolverConfigError {
    #[error("Invalid identifier pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid public schema: {0}")]
    PublicSchema(#[from] NamespaceError),
}

/// Where a host points before the catalog has been consulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Public,
    Tenant(Namespace),
}

/// Outcome of resolving one request
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub host: String,
    pub namespace: Namespace,
    pub tenant: Option<Tenant>,
}

/// Maps request hostnames to namespaces.
///
/// Hosts on the public allow-list, IP literals and single-label hosts use the
/// shared namespace. Any other host routes to the tenant that registered it in
/// the domain registry; unregistered hosts fall back to the tenant named by
/// their leftmost DNS label. Only catalog rows in `active` status are routable.
pub struct TenantResolver {
    public_domains: HashSet<String>,
    public_namespace: Namespace,
    identifier_pattern: Regex,
    catalog: Arc<dyn TenantCatalog>,
    domains: Arc<dyn DomainRegistry>,
}

impl TenantResolver {
    pub fn new(
        config: &TenancyConfig,
        catalog: Arc<dyn TenantCatalog>,
        domains: Arc<dyn DomainRegistry>,
    ) -> Result<Self, ResolverConfigError> {
        Ok(Self {
            public_domains: config
                .public_domains
                .iter()
                .map(|d| normalize_host(d))
                .collect(),
            public_namespace: Namespace::parse(&config.public_schema)?,
            identifier_pattern: Regex::new(&config.identifier_pattern)?,
            catalog,
            domains,
        })
    }

    pub fn public_namespace(&self) -> &Namespace {
        &self.public_namespace
    }

    /// Derive the target namespace from a raw `Host` value. Performs no I/O.
    pub fn candidate(&self, raw_host: &str) -> Result<Candidate, ResolveError> {
        let host = normalize_host(raw_host);
        if host.is_empty() {
            return Err(ResolveError::MissingHost);
        }

        if self.public_domains.contains(&host) || is_ip_literal(&host) {
            return Ok(Candidate::Public);
        }

        let mut labels = host.split('.');
        let leftmost = labels.next().unwrap_or_default();
        if labels.next().is_none() {
            return Ok(Candidate::Public);
        }

        if !self.identifier_pattern.is_match(leftmost) {
            return Err(ResolveError::InvalidSchemaIdentifier(leftmost.to_string()));
        }
        let namespace = Namespace::parse(leftmost)
            .map_err(|_| ResolveError::InvalidSchemaIdentifier(leftmost.to_string()))?;

        if namespace == self.public_namespace {
            Ok(Candidate::Public)
        } else {
            Ok(Candidate::Tenant(namespace))
        }
    }

    /// Resolve a host to its namespace and tenant row
    pub async fn resolve(&self, raw_host: &str) -> Result<Resolution, ResolveError> {
        let host = normalize_host(raw_host);

        let namespace = match self.candidate(raw_host)? {
            Candidate::Public => {
                return Ok(Resolution {
                    host,
                    namespace: self.public_namespace.clone(),
                    tenant: None,
                });
            }
            Candidate::Tenant(namespace) => namespace,
        };

        let (namespace, tenant) = match self.domains.find_by_hostname(&host).await? {
            Some(domain) => {
                let tenant = self.catalog.find_by_id(domain.tenant_id).await?;
                let namespace = tenant
                    .as_ref()
                    .map(|t| t.schema_name.clone())
                    .unwrap_or(namespace);
                (namespace, tenant)
            }
            None => {
                let tenant = self.catalog.find_by_schema(&namespace).await?;
                (namespace, tenant)
            }
        };

        match tenant {
            Some(tenant) if tenant.is_active() => {
                debug!("Host '{}' resolved to tenant '{}'", host, tenant.schema_name);
                Ok(Resolution {
                    host,
                    namespace,
                    tenant: Some(tenant),
                })
            }
            Some(tenant) => {
                warn!(
                    "Host '{}' matches tenant '{}' which is {}, not routable",
                    host, tenant.schema_name, tenant.status
                );
                Err(ResolveError::TenantNotFound(namespace.to_string()))
            }
            None => {
                debug!("Host '{}' matches no tenant", host);
                Err(ResolveError::TenantNotFound(namespace.to_string()))
            }
        }
    }
}
