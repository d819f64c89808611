pub mod auth;
pub mod resolve_tenant;
pub mod response;
pub mod tenant_context;

pub use auth::{require_root, RootUser};
pub use resolve_tenant::{resolve_tenant_middleware, TenantRouting};
pub use response::{ApiResponse, ApiResult};
pub use tenant_context::{require_public_host, RequiredTenant, TenantContext};
