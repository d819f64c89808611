use clap::Args;
use serde_json::json;

use crate::auth::RootAuth;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Args)]
pub struct TokenArgs {
    /// Operator name recorded in the token and in server logs
    #[arg(long, default_value = "tenantctl")]
    pub subject: String,

    /// Lifetime in hours; defaults to SECURITY_JWT_EXPIRY_HOURS
    #[arg(long)]
    pub hours: Option<u64>,
}

/// Mint a root token for `/api/root/tenant` with the server's JWT_SECRET
pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let hours = args.hours.unwrap_or(security.jwt_expiry_hours);
    let token = RootAuth::new(&security.jwt_secret, hours).issue(&args.subject)?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            &format!("Root token for {}", args.subject),
            Some(json!({ "token": token, "expires_in_hours": hours })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
