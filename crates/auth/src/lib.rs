//! `verihire-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it holds the
//! role/permission model and the permission evaluator, nothing else. Both
//! evaluator checks return booleans and never raise; translation into
//! [`verihire_core::SecurityError::AuthorizationDenied`] happens at the
//! composing [`authorize`] boundary.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{action_allowed, authorize, owns_tenant_data, TenantScoped};
pub use permissions::PermissionSet;
pub use principal::{Principal, Profile};
pub use roles::{Role, RoleCatalog, RoleName};
