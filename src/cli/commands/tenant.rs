use clap::Subcommand;
use serde_json::json;

use super::Backend;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::AdminIdentity;
use crate::services::ProvisionRequest;
use crate::types::Namespace;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Provision a new tenant")]
    Create {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Schema identifier; also the leftmost label of the domain")]
        schema: String,
        #[arg(long, help = "Primary domain, e.g. acme.example.com")]
        domain: String,
        #[arg(long, help = "Administrator email")]
        admin_email: String,
        #[arg(long, help = "Administrator username (defaults to the email's local part)")]
        admin_username: Option<String>,
        #[arg(long, help = "Pre-hashed administrator password")]
        admin_password_hash: Option<String>,
    },

    #[command(about = "List all tenants")]
    List,

    #[command(about = "Show a tenant and its domains")]
    Show {
        #[arg(help = "Schema identifier")]
        schema: String,
    },

    #[command(about = "Route another hostname to a tenant")]
    AddDomain {
        #[arg(help = "Schema identifier")]
        schema: String,
        #[arg(help = "Hostname")]
        domain: String,
        #[arg(long, help = "Mark as the tenant's primary domain")]
        primary: bool,
    },

    #[command(about = "Drop a tenant's namespace and routing. Irreversible")]
    Delete {
        #[arg(help = "Schema identifier")]
        schema: String,
        #[arg(long, help = "Repeat the schema identifier to confirm")]
        confirm: String,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let backend = Backend::connect()?;

    match cmd {
        TenantCommands::Create {
            name,
            schema,
            domain,
            admin_email,
            admin_username,
            admin_password_hash,
        } => {
            let request = ProvisionRequest {
                name,
                schema,
                domain,
                admin: AdminIdentity {
                    username: admin_username,
                    email: Some(admin_email),
                    password_hash: admin_password_hash,
                },
            };
            let provisioned = backend.provisioner().provision(request).await?;
            output_success(
                &output_format,
                &format!(
                    "Tenant '{}' is live on {}",
                    provisioned.tenant.schema_name, provisioned.domain
                ),
                Some(json!(provisioned)),
            )
        }
        TenantCommands::List => {
            let tenants = backend.stores.tenants.list().await?;
            match output_format {
                OutputFormat::Json => output_record(&output_format, &tenants),
                OutputFormat::Text => {
                    if tenants.is_empty() {
                        println!("No tenants");
                        return Ok(());
                    }
                    println!("{:<20} {:<16} {:<25} {}", "SCHEMA", "STATUS", "NAME", "CREATED");
                    println!("{}", "-".repeat(80));
                    for tenant in &tenants {
                        println!(
                            "{:<20} {:<16} {:<25} {}",
                            tenant.schema_name,
                            tenant.status,
                            tenant.name,
                            tenant.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                    Ok(())
                }
            }
        }
        TenantCommands::Show { schema } => {
            let schema = Namespace::parse_tenant(&schema)?;
            let tenant = backend
                .stores
                .tenants
                .find_by_schema(&schema)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Tenant '{}' not found", schema))?;
            let domains = backend.stores.domains.list_for_tenant(tenant.id).await?;
            output_record(&output_format, &json!({ "tenant": tenant, "domains": domains }))
        }
        TenantCommands::AddDomain {
            schema,
            domain,
            primary,
        } => {
            let added = backend
                .provisioner()
                .add_domain(&schema, &domain, primary)
                .await?;
            output_success(
                &output_format,
                &format!("{} now routes to '{}'", added.domain, schema),
                Some(json!(added)),
            )
        }
        TenantCommands::Delete { schema, confirm } => {
            let gone = backend.provisioner().decommission(&schema, &confirm).await?;
            output_success(
                &output_format,
                &format!("Tenant '{}' decommissioned", gone.tenant.schema_name),
                Some(json!(gone)),
            )
        }
    }
}
