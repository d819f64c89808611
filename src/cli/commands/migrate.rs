use clap::Subcommand;
use serde_json::json;

use super::Backend;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::services::migrate_all_tenants;

#[derive(Subcommand)]
pub enum MigrateCommands {
    #[command(about = "Apply catalog migrations to the shared namespace")]
    Public,

    #[command(about = "Apply tenant migrations to every active tenant namespace")]
    Tenants,
}

pub async fn handle(cmd: MigrateCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = Backend::connect()?;

    match cmd {
        MigrateCommands::Public => {
            DatabaseManager::migrate_public(&backend.pool, &backend.public).await?;
            output_success(
                &output_format,
                &format!("Shared namespace '{}' is up to date", backend.public),
                None,
            )
        }
        MigrateCommands::Tenants => {
            let report = migrate_all_tenants(&backend.stores).await?;
            let summary = format!(
                "{} migrated, {} skipped, {} failed",
                report.migrated.len(),
                report.skipped.len(),
                report.failed.len()
            );

            if report.is_success() {
                return output_success(&output_format, &summary, Some(json!(report)));
            }

            for failure in &report.failed {
                output_error(&output_format, &format!("{}: {}", failure.schema, failure.message), None)?;
            }
            anyhow::bail!("tenant migrations incomplete ({})", summary)
        }
    }
}
