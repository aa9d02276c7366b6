use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verihire_core::{TenantId, UserId};

use crate::roles::RoleName;

/// Links a principal to a role and a tenant.
///
/// Both links are optional and weak: a null role grants zero permissions, a
/// null company means no tenant scope (full access only via the system-admin
/// flag on the principal itself).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub role: Option<RoleName>,
    pub company: Option<TenantId>,
    pub phone: Option<String>,
}

/// An authenticated identity attempting an operation.
///
/// Invariant (enforced at the persistence boundary, asserted by the tenant
/// check): a non-system-admin principal must resolve to exactly one company
/// for all tenant-scoped operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub is_system_admin: bool,
    pub is_company_admin: bool,
    pub is_active: bool,
    pub profile: Option<Profile>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
}

impl Principal {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_system_admin: false,
            is_company_admin: false,
            is_active: true,
            profile: None,
            last_login: None,
            last_login_ip: None,
        }
    }

    pub fn system_admin(mut self) -> Self {
        self.is_system_admin = true;
        self
    }

    pub fn company_admin(mut self) -> Self {
        self.is_company_admin = true;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_profile(mut self, role: Option<RoleName>, company: Option<TenantId>) -> Self {
        self.profile = Some(Profile {
            role,
            company,
            phone: None,
        });
        self
    }

    /// The role this principal acts under, if any.
    pub fn role(&self) -> Option<RoleName> {
        self.profile.as_ref().and_then(|p| p.role)
    }

    /// The tenant this principal is scoped to, if any.
    pub fn company(&self) -> Option<TenantId> {
        self.profile.as_ref().and_then(|p| p.company)
    }
}
