use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info};

use crate::database::manager::DatabaseError;
use crate::database::models::TenantStatus;
use crate::database::Stores;
use crate::types::Namespace;

/// Namespaces migrated at the same time
const MIGRATION_CONCURRENCY: usize = 4;

#[derive(Debug, Default, Serialize)]
pub struct MigrationReport {
    pub migrated: Vec<String>,
    /// Tenants not yet (or no longer) routable
    pub skipped: Vec<String>,
    pub failed: Vec<MigrationFailure>,
}

#[derive(Debug, Serialize)]
pub struct MigrationFailure {
    pub schema: String,
    pub message: String,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Bring every active tenant namespace to the current schema version,
/// recreating namespaces that went missing.
///
/// One tenant failing does not stop the sweep; failures are collected in
/// the report. Only listing the catalog itself is fatal.
pub async fn migrate_all_tenants(stores: &Stores) -> Result<MigrationReport, DatabaseError> {
    let tenants = stores.tenants.list().await?;
    let mut report = MigrationReport::default();

    let mut active: Vec<Namespace> = Vec::new();
    for tenant in tenants {
        if tenant.status == TenantStatus::Active {
            active.push(tenant.schema_name);
        } else {
            report.skipped.push(tenant.schema_name.to_string());
        }
    }

    let outcomes: Vec<(Namespace, Result<(), DatabaseError>)> = stream::iter(active)
        .map(|schema| async move {
            let outcome = match stores.schemas.create_namespace_if_absent(&schema).await {
                Ok(()) => stores.schemas.run_migrations(&schema).await,
                Err(e) => Err(e),
            };
            (schema, outcome)
        })
        .buffered(MIGRATION_CONCURRENCY)
        .collect()
        .await;

    for (schema, outcome) in outcomes {
        match outcome {
            Ok(()) => report.migrated.push(schema.to_string()),
            Err(e) => {
                error!("Migration of '{}' failed: {}", schema, e);
                report.failed.push(MigrationFailure {
                    schema: schema.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        "Tenant migrations: {} migrated, {} skipped, {} failed",
        report.migrated.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(report)
}
