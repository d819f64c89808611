use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::Site;
use crate::database::traits::SiteDirectory;
use crate::types::Namespace;

/// `sites` table of the shared namespace
#[derive(Clone)]
pub struct PgSiteDirectory {
    pool: PgPool,
    table: String,
}

impl PgSiteDirectory {
    pub fn new(pool: PgPool, shared: &Namespace) -> Self {
        Self {
            pool,
            table: format!("{}.sites", shared.quoted()),
        }
    }
}

#[async_trait]
impl SiteDirectory for PgSiteDirectory {
    async fn get(&self, id: i64) -> Result<Option<Site>, DatabaseError> {
        let site = sqlx::query_as::<_, Site>(&format!("SELECT id, domain, name FROM {} WHERE id = $1", self.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(site)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, DatabaseError> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT id, domain, name FROM {} WHERE domain = $1",
            self.table
        ))
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;
        Ok(site)
    }

    async fn update(&self, id: i64, domain: &str, name: &str) -> Result<Site, DatabaseError> {
        sqlx::query_as::<_, Site>(&format!(
            "UPDATE {} SET domain = $2, name = $3 WHERE id = $1
             RETURNING id, domain, name",
            self.table
        ))
        .bind(id)
        .bind(domain)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("site {}", id)))
    }

    async fn upsert_by_domain(&self, domain: &str, name: &str) -> Result<Site, DatabaseError> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "INSERT INTO {} (domain, name) VALUES ($1, $2)
             ON CONFLICT (domain) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, domain, name",
            self.table
        ))
        .bind(domain)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(site)
    }

    async fn delete_by_domain(&self, domain: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE domain = $1", self.table))
            .bind(domain)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
