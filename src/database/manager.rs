use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::types::Namespace;

/// Catalog, domain registry and site directory, applied to the shared namespace
pub static PUBLIC_MIGRATOR: Migrator = sqlx::migrate!("./migrations/public");

/// Per-tenant tables, applied inside each tenant namespace
pub static TENANT_MIGRATOR: Migrator = sqlx::migrate!("./migrations/tenant");

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Refusing to operate on reserved namespace: {0}")]
    ReservedNamespace(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    #[error("Migration error: {0}")]
    Migration(#[from] MigrateError),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation { .. })
    }

    /// Name of the violated constraint, when the database reported one
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::UniqueViolation { constraint } => constraint.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return DatabaseError::UniqueViolation {
                    constraint: db_err.constraint().map(str::to_string),
                };
            }
        }
        DatabaseError::Sqlx(err)
    }
}

/// Builds the shared connection pool and runs the shared-namespace migrations
pub struct DatabaseManager;

impl DatabaseManager {
    /// Create the pool without connecting; connections open on first use.
    ///
    /// Every connection returned to the pool has its `search_path` reset so a
    /// namespace bound for one request never carries over to the next one.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("RESET search_path").execute(&mut *conn).await?;
                    Ok(true)
                })
            })
            .connect_lazy(&database_url)?;

        info!("Database pool configured for {}", Self::redacted_url(&database_url)?);
        Ok(pool)
    }

    /// DATABASE_URL with the password masked, for logs
    pub fn redacted_url(database_url: &str) -> Result<String, DatabaseError> {
        let mut url = url::Url::parse(database_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if url.password().is_some() {
            url.set_password(Some("***"))
                .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        }
        Ok(url.into())
    }

    /// Pin `search_path` of a single connection to exactly one namespace
    pub async fn bind_search_path(
        conn: &mut PgConnection,
        namespace: &Namespace,
    ) -> Result<(), DatabaseError> {
        sqlx::query("SELECT set_config('search_path', $1, false)")
            .bind(namespace.quoted())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Single-connection pool with the same connect options as `pool`,
    /// whose connection has `search_path` pinned to `namespace`.
    ///
    /// Migrators run against this so their bookkeeping table lands inside
    /// the namespace being migrated.
    pub async fn pinned_pool(pool: &PgPool, namespace: &Namespace) -> Result<PgPool, DatabaseError> {
        let search_path = namespace.quoted();
        let options = (*pool.connect_options()).clone();
        let pinned = PgPoolOptions::new()
            .max_connections(1)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    sqlx::query("SELECT set_config('search_path', $1, false)")
                        .bind(search_path)
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;
        Ok(pinned)
    }

    /// Run `migrator` inside `namespace`
    pub async fn migrate_namespace(
        pool: &PgPool,
        namespace: &Namespace,
        migrator: &Migrator,
    ) -> Result<(), DatabaseError> {
        let pinned = Self::pinned_pool(pool, namespace).await?;
        let result = migrator.run(&pinned).await;
        pinned.close().await;
        result?;
        Ok(())
    }

    /// Apply catalog migrations to the shared namespace
    pub async fn migrate_public(pool: &PgPool, public: &Namespace) -> Result<(), DatabaseError> {
        Self::migrate_namespace(pool, public, &PUBLIC_MIGRATOR).await?;
        info!("Shared namespace '{}' migrated", public);
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
