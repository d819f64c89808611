// handlers/elevated/root/tenant/mod.rs - Tenant lifecycle handlers

use crate::error::ApiError;
use crate::types::Namespace;

pub mod create; // POST   /api/root/tenant
pub mod delete; // DELETE /api/root/tenant/:schema?confirm=:schema
pub mod domain; // POST   /api/root/tenant/:schema/domain
pub mod health; // GET    /api/root/tenant/:schema/health
pub mod list; // GET    /api/root/tenant
pub mod show; // GET    /api/root/tenant/:schema

pub use create::tenant_create;
pub use delete::tenant_delete;
pub use domain::tenant_domain_add;
pub use health::tenant_health;
pub use list::tenant_list;
pub use show::tenant_show;

fn schema_param(raw: &str) -> Result<Namespace, ApiError> {
    Namespace::parse_tenant(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}
