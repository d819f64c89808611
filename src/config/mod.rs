use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub tenancy: TenancyConfig,
    pub provisioning: ProvisioningConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Host-to-schema routing settings consumed by the tenant resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Hostnames that always route to the shared namespace
    pub public_domains: Vec<String>,
    pub public_schema: String,
    /// Allow-list pattern a hostname-derived identifier must match
    pub identifier_pattern: String,
    /// Redirect target (and resolver-exempt path) for unknown tenants
    pub not_found_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    pub step_timeout_secs: u64,
    /// Point the default site entry at every newly provisioned tenant
    pub sync_default_site: bool,
    pub default_site_id: i64,
    /// What the default site entry is reset to when its tenant goes away
    pub default_site_domain: String,
    pub default_site_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// HS256 secret for root tokens; empty disables tenant administration
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

impl ProvisioningConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            public_domains: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            public_schema: crate::types::PUBLIC_SCHEMA.to_string(),
            identifier_pattern: r"^[A-Za-z0-9_]+$".to_string(),
            not_found_url: "/tenant-not-found".to_string(),
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: 120,
            sync_default_site: false,
            default_site_id: 1,
            default_site_domain: "example.com".to_string(),
            default_site_name: "example.com".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Tenancy overrides
        if let Ok(v) = env::var("TENANT_PUBLIC_DOMAINS") {
            self.tenancy.public_domains = split_list(&v);
        }
        if let Ok(v) = env::var("TENANT_PUBLIC_SCHEMA") {
            self.tenancy.public_schema = v;
        }
        if let Ok(v) = env::var("TENANT_IDENTIFIER_PATTERN") {
            self.tenancy.identifier_pattern = v;
        }
        if let Ok(v) = env::var("TENANT_NOT_FOUND_URL") {
            self.tenancy.not_found_url = v;
        }

        // Provisioning overrides
        if let Ok(v) = env::var("PROVISION_STEP_TIMEOUT_SECS") {
            self.provisioning.step_timeout_secs = v.parse().unwrap_or(self.provisioning.step_timeout_secs);
        }
        if let Ok(v) = env::var("PROVISION_SYNC_DEFAULT_SITE") {
            self.provisioning.sync_default_site = v.parse().unwrap_or(self.provisioning.sync_default_site);
        }
        if let Ok(v) = env::var("PROVISION_DEFAULT_SITE_ID") {
            self.provisioning.default_site_id = v.parse().unwrap_or(self.provisioning.default_site_id);
        }
        if let Ok(v) = env::var("PROVISION_DEFAULT_SITE_DOMAIN") {
            self.provisioning.default_site_domain = v;
        }
        if let Ok(v) = env::var("PROVISION_DEFAULT_SITE_NAME") {
            self.provisioning.default_site_name = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("TENANT_GATE_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            tenancy: TenancyConfig::default(),
            provisioning: ProvisioningConfig::default(),
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig { port: 3000 },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            tenancy: TenancyConfig {
                public_domains: vec!["staging.example.com".to_string()],
                ..TenancyConfig::default()
            },
            provisioning: ProvisioningConfig {
                step_timeout_secs: 300,
                ..ProvisioningConfig::default()
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig { port: 8080 },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            tenancy: TenancyConfig {
                public_domains: vec!["example.com".to_string(), "www.example.com".to_string()],
                ..TenancyConfig::default()
            },
            provisioning: ProvisioningConfig {
                step_timeout_secs: 300,
                ..ProvisioningConfig::default()
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig { port: 8080 },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
