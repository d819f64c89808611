use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Hostname routed to a tenant. Hostnames are unique across all tenants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Domain {
    pub id: i64,
    pub domain: String,
    pub tenant_id: Uuid,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
