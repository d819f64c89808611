use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Domain, Tenant, TenantStatus};
use crate::database::traits::{DomainRegistry, TenantCatalog};
use crate::types::Namespace;

const TENANT_COLUMNS: &str = "id, name, schema_name, status, created_at, updated_at";
const DOMAIN_COLUMNS: &str = "id, domain, tenant_id, is_primary, created_at, updated_at";

/// `tenants` table of the shared namespace
#[derive(Clone)]
pub struct PgTenantCatalog {
    pool: PgPool,
    table: String,
}

impl PgTenantCatalog {
    pub fn new(pool: PgPool, shared: &Namespace) -> Self {
        Self {
            pool,
            table: format!("{}.tenants", shared.quoted()),
        }
    }
}

#[async_trait]
impl TenantCatalog for PgTenantCatalog {
    async fn find_by_schema(&self, schema: &Namespace) -> Result<Option<Tenant>, DatabaseError> {
        let table = &self.table;
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM {table} WHERE schema_name = $1"
        ))
        .bind(schema.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        let table = &self.table;
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM {table} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn create(&self, name: &str, schema: &Namespace) -> Result<Tenant, DatabaseError> {
        let table = &self.table;
        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "INSERT INTO {table} (id, name, schema_name, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(schema.as_str())
        .bind(TenantStatus::Provisioning.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(tenant)
    }

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Tenant, DatabaseError> {
        let table = &self.table;
        sqlx::query_as::<_, Tenant>(&format!(
            "UPDATE {table} SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("tenant {}", id)))
    }

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let table = &self.table;
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM {table} ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(tenants)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        // domains cascade through the foreign key
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `domains` table of the shared namespace
#[derive(Clone)]
pub struct PgDomainRegistry {
    pool: PgPool,
    table: String,
}

impl PgDomainRegistry {
    pub fn new(pool: PgPool, shared: &Namespace) -> Self {
        Self {
            pool,
            table: format!("{}.domains", shared.quoted()),
        }
    }
}

#[async_trait]
impl DomainRegistry for PgDomainRegistry {
    async fn create(
        &self,
        hostname: &str,
        tenant: &Tenant,
        is_primary: bool,
    ) -> Result<Domain, DatabaseError> {
        let table = &self.table;
        let domain = sqlx::query_as::<_, Domain>(&format!(
            "INSERT INTO {table} (domain, tenant_id, is_primary)
             VALUES ($1, $2, $3)
             RETURNING {DOMAIN_COLUMNS}"
        ))
        .bind(hostname)
        .bind(tenant.id)
        .bind(is_primary)
        .fetch_one(&self.pool)
        .await?;
        Ok(domain)
    }

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Domain>, DatabaseError> {
        let table = &self.table;
        let domain = sqlx::query_as::<_, Domain>(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM {table} WHERE domain = $1"
        ))
        .bind(hostname)
        .fetch_optional(&self.pool)
        .await?;
        Ok(domain)
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Domain>, DatabaseError> {
        let table = &self.table;
        let domains = sqlx::query_as::<_, Domain>(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM {table}
             WHERE tenant_id = $1
             ORDER BY is_primary DESC, domain"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(domains)
    }
}
