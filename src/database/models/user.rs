use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ADMIN_ROLE: &str = "admin";

/// Administrator seeded inside a tenant namespace at provisioning time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity of the person requesting a new tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub username: Option<String>,
    pub email: Option<String>,
    /// Already-hashed credential copied into the tenant, never a plain password
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
}

/// Admin identity after validation: email present, username resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
}

impl AdminIdentity {
    /// Email is the login key inside a tenant; a missing username falls back
    /// to the email's local part.
    pub fn to_seed(&self) -> Result<AdminSeed, String> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| "the admin user must have an email address".to_string())?;

        let (local, _) = email
            .split_once('@')
            .filter(|(local, host)| !local.is_empty() && !host.is_empty())
            .ok_or_else(|| format!("'{}' is not a valid email address", email))?;

        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(local)
            .to_string();

        Ok(AdminSeed {
            username,
            email: email.to_ascii_lowercase(),
            password_hash: self.password_hash.clone(),
        })
    }
}
