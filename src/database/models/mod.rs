pub mod domain;
pub mod site;
pub mod tenant;
pub mod user;

pub use domain::Domain;
pub use site::Site;
pub use tenant::{Tenant, TenantStatus};
pub use user::{AdminIdentity, AdminSeed, AdminUser, ADMIN_ROLE};
