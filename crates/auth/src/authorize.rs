//! Permission evaluator.
//!
//! Two independent checks, composed by the caller:
//! - [`action_allowed`]: flat `"{resource}_{action}"` lookup against the
//!   principal's role, with a system-admin short-circuit.
//! - [`owns_tenant_data`]: row-level tenant-ownership check via
//!   [`TenantScoped`]; objects that expose no tenant are denied (fail closed).
//!
//! Both return booleans and never raise. [`authorize`] composes them and maps
//! `false` into [`SecurityError::AuthorizationDenied`] for the HTTP boundary.

use verihire_core::{SecurityError, TenantId};

use crate::principal::Principal;
use crate::roles::{Role, RoleCatalog, RoleName};

/// A target object that may expose the tenant it belongs to.
///
/// `None` means the object exposes no tenant relation; ownership checks deny
/// such objects by default. Objects owned through one level of indirection
/// (a position belongs to a company through its employee) are checked by
/// resolving the intermediate record first.
pub trait TenantScoped {
    fn tenant_id(&self) -> Option<TenantId>;
}

impl TenantScoped for TenantId {
    fn tenant_id(&self) -> Option<TenantId> {
        Some(*self)
    }
}

/// Whether the principal's role grants `"{resource}_{action}"`.
///
/// A system-admin flag short-circuits to `true` for every check. A principal
/// without a role has zero permissions.
pub fn action_allowed(
    principal: &Principal,
    role: Option<&Role>,
    resource: &str,
    action: &str,
) -> bool {
    if principal.is_system_admin {
        return true;
    }
    if !principal.is_active {
        return false;
    }
    match role {
        Some(role) => role.permissions.allows(resource, action),
        None => false,
    }
}

/// Row-level tenant-ownership check.
///
/// Authorized iff the principal is a system admin, OR carries the top-level
/// platform-admin role, OR is scoped to the same company the object belongs
/// to. Objects exposing no tenant are denied.
pub fn owns_tenant_data(principal: &Principal, object: &dyn TenantScoped) -> bool {
    if principal.is_system_admin {
        return true;
    }
    if principal.role() == Some(RoleName::PlatformAdmin) {
        return true;
    }
    match (principal.company(), object.tenant_id()) {
        (Some(own), Some(target)) => own == target,
        _ => false,
    }
}

/// Composed authorization for a (principal, resource, action, object) tuple.
///
/// This is the outward-facing check used by every handler wrapping a tenant
/// operation; it is the only place a `false` becomes an error.
pub fn authorize(
    principal: &Principal,
    catalog: &RoleCatalog,
    resource: &str,
    action: &str,
    object: Option<&dyn TenantScoped>,
) -> Result<(), SecurityError> {
    let role = principal.role().and_then(|name| catalog.get(name));
    if !action_allowed(principal, role, resource, action) {
        return Err(SecurityError::AuthorizationDenied);
    }
    if let Some(object) = object {
        if !owns_tenant_data(principal, object) {
            return Err(SecurityError::AuthorizationDenied);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use verihire_core::UserId;

    fn catalog() -> RoleCatalog {
        RoleCatalog::builtin()
    }

    fn hr_manager(company: TenantId) -> Principal {
        Principal::new(UserId::new(), "hr").with_profile(Some(RoleName::HrManager), Some(company))
    }

    #[test]
    fn system_admin_short_circuits_every_check() {
        let admin = Principal::new(UserId::new(), "root").system_admin();
        // No role, no profile; still allowed.
        assert!(action_allowed(&admin, None, "employee", "destroy"));
        assert!(action_allowed(&admin, None, "anything", "at_all"));
        assert!(owns_tenant_data(&admin, &TenantId::new()));
    }

    #[test]
    fn missing_role_grants_nothing() {
        let principal = Principal::new(UserId::new(), "norole");
        assert!(!action_allowed(&principal, None, "employee", "retrieve"));
    }

    #[test]
    fn hr_manager_denied_destroy_in_own_tenant() {
        let company = TenantId::new();
        let hr = hr_manager(company);
        let err = authorize(&hr, &catalog(), "employee", "destroy", Some(&company)).unwrap_err();
        assert_eq!(err, SecurityError::AuthorizationDenied);
        // The ownership half would have passed; the action half failed.
        assert!(owns_tenant_data(&hr, &company));
    }

    #[test]
    fn company_admin_denied_cross_tenant_retrieve() {
        let company_a = TenantId::new();
        let company_b = TenantId::new();
        let admin = Principal::new(UserId::new(), "aadmin")
            .company_admin()
            .with_profile(Some(RoleName::CompanyAdmin), Some(company_a));

        // Action permission for employee_retrieve is granted...
        let role = catalog().get(RoleName::CompanyAdmin).cloned().unwrap();
        assert!(action_allowed(&admin, Some(&role), "employee", "retrieve"));

        // ...but the tenant-ownership check fails for company B's data.
        let err =
            authorize(&admin, &catalog(), "employee", "retrieve", Some(&company_b)).unwrap_err();
        assert_eq!(err, SecurityError::AuthorizationDenied);
    }

    #[test]
    fn platform_admin_role_owns_all_tenants() {
        let principal = Principal::new(UserId::new(), "ops")
            .with_profile(Some(RoleName::PlatformAdmin), None);
        assert!(owns_tenant_data(&principal, &TenantId::new()));
    }

    struct Unscoped;
    impl TenantScoped for Unscoped {
        fn tenant_id(&self) -> Option<TenantId> {
            None
        }
    }

    #[test]
    fn object_without_tenant_relation_is_denied() {
        let company = TenantId::new();
        let hr = hr_manager(company);
        assert!(!owns_tenant_data(&hr, &Unscoped));
    }

    #[test]
    fn deactivated_principal_loses_action_permissions() {
        let company = TenantId::new();
        let mut hr = hr_manager(company);
        hr.is_active = false;
        let role = catalog().get(RoleName::HrManager).cloned().unwrap();
        assert!(!action_allowed(&hr, Some(&role), "employee", "retrieve"));
    }
}
