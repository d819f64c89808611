use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::database::manager::{DatabaseError, DatabaseManager, TENANT_MIGRATOR};
use crate::database::models::{AdminSeed, AdminUser, ADMIN_ROLE};
use crate::database::traits::{NamespaceBinder, SchemaStore};
use crate::types::Namespace;

/// Postgres schemas as tenant namespaces
#[derive(Clone)]
pub struct PgSchemaStore {
    pool: PgPool,
}

/// A pooled connection whose `search_path` is pinned to one namespace.
///
/// Cloned into request extensions; the connection goes back to the pool
/// (and has its `search_path` reset) once the last clone is dropped.
#[derive(Clone)]
pub struct PgSession {
    namespace: Namespace,
    conn: Arc<Mutex<PoolConnection<Postgres>>>,
}

impl PgSession {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Exclusive access to the bound connection
    pub async fn connection(&self) -> MutexGuard<'_, PoolConnection<Postgres>> {
        self.conn.lock().await
    }
}

impl PgSchemaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn pinned_connection(
        &self,
        namespace: &Namespace,
    ) -> Result<PoolConnection<Postgres>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        DatabaseManager::bind_search_path(&mut conn, namespace).await?;
        Ok(conn)
    }
}

#[async_trait]
impl SchemaStore for PgSchemaStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn namespace_exists(&self, namespace: &Namespace) -> Result<bool, DatabaseError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
                .bind(namespace.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn create_namespace_if_absent(&self, namespace: &Namespace) -> Result<(), DatabaseError> {
        let ddl = format!("CREATE SCHEMA IF NOT EXISTS {}", namespace.quoted());
        sqlx::query(&ddl).execute(&self.pool).await?;
        debug!("Namespace '{}' present", namespace);
        Ok(())
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<(), DatabaseError> {
        if namespace.is_reserved() {
            return Err(DatabaseError::ReservedNamespace(namespace.to_string()));
        }
        let ddl = format!("DROP SCHEMA IF EXISTS {} CASCADE", namespace.quoted());
        sqlx::query(&ddl).execute(&self.pool).await?;
        info!("Namespace '{}' dropped", namespace);
        Ok(())
    }

    async fn run_migrations(&self, namespace: &Namespace) -> Result<(), DatabaseError> {
        DatabaseManager::migrate_namespace(&self.pool, namespace, &TENANT_MIGRATOR).await?;
        info!("Namespace '{}' migrated", namespace);
        Ok(())
    }

    async fn create_admin(
        &self,
        namespace: &Namespace,
        seed: &AdminSeed,
    ) -> Result<AdminUser, DatabaseError> {
        let mut conn = self.pinned_connection(namespace).await?;
        let admin = sqlx::query_as::<_, AdminUser>(
            r#"
            INSERT INTO users (username, email, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (email) DO UPDATE
               SET username = EXCLUDED.username,
                   password_hash = COALESCE(EXCLUDED.password_hash, users.password_hash),
                   role = EXCLUDED.role,
                   is_active = TRUE,
                   updated_at = NOW()
            RETURNING id, username, email, role, is_active, created_at, updated_at
            "#,
        )
        .bind(&seed.username)
        .bind(&seed.email)
        .bind(&seed.password_hash)
        .bind(ADMIN_ROLE)
        .fetch_one(&mut *conn)
        .await?;
        Ok(admin)
    }

    async fn count_admins(&self, namespace: &Namespace) -> Result<i64, DatabaseError> {
        let mut conn = self.pinned_connection(namespace).await?;
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(ADMIN_ROLE)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl NamespaceBinder for PgSchemaStore {
    type Session = PgSession;

    async fn bind(&self, namespace: &Namespace) -> Result<PgSession, DatabaseError> {
        let conn = self.pinned_connection(namespace).await?;
        Ok(PgSession {
            namespace: namespace.clone(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}
