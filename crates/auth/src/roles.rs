use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionSet;

/// Built-in role identifiers.
///
/// Roles are immutable reference data; profiles reference a role by name and
/// never copy its grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    /// Top-level operator role; owns data across every tenant.
    PlatformAdmin,
    /// Administers a single company.
    CompanyAdmin,
    /// Manages employee records within a company (no destroy, no bulk ops).
    HrManager,
    /// Regular employee; read-only.
    Employee,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::PlatformAdmin => "platform_admin",
            RoleName::CompanyAdmin => "company_admin",
            RoleName::HrManager => "hr_manager",
            RoleName::Employee => "employee",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "platform_admin" => Some(RoleName::PlatformAdmin),
            "company_admin" => Some(RoleName::CompanyAdmin),
            "hr_manager" => Some(RoleName::HrManager),
            "employee" => Some(RoleName::Employee),
            _ => None,
        }
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named bundle of permission grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,
    pub description: String,
    pub permissions: PermissionSet,
}

/// Catalog of the built-in roles and their grants.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    roles: BTreeMap<&'static str, Role>,
}

impl RoleCatalog {
    /// The default role catalog seeded into every deployment.
    pub fn builtin() -> Self {
        let mut roles = BTreeMap::new();

        let platform_admin = Role {
            name: RoleName::PlatformAdmin,
            description: "Full system administrator".to_string(),
            permissions: PermissionSet::new()
                .grant("company", "list")
                .grant("company", "create")
                .grant("company", "retrieve")
                .grant("company", "update")
                .grant("company", "destroy")
                .grant("employee", "list")
                .grant("employee", "create")
                .grant("employee", "retrieve")
                .grant("employee", "update")
                .grant("employee", "destroy")
                .grant_key("bulk_operations"),
        };

        let company_admin = Role {
            name: RoleName::CompanyAdmin,
            description: "Company administrator".to_string(),
            permissions: PermissionSet::new()
                .grant("company", "retrieve")
                .grant("company", "update")
                .grant("employee", "list")
                .grant("employee", "create")
                .grant("employee", "retrieve")
                .grant("employee", "update")
                .grant("employee", "destroy")
                .grant_key("bulk_operations"),
        };

        let hr_manager = Role {
            name: RoleName::HrManager,
            description: "HR manager".to_string(),
            permissions: PermissionSet::new()
                .grant("company", "retrieve")
                .grant("employee", "list")
                .grant("employee", "create")
                .grant("employee", "retrieve")
                .grant("employee", "update"),
        };

        let employee = Role {
            name: RoleName::Employee,
            description: "Regular employee".to_string(),
            permissions: PermissionSet::new()
                .grant("company", "retrieve")
                .grant("employee", "retrieve"),
        };

        for role in [platform_admin, company_admin, hr_manager, employee] {
            roles.insert(role.name.as_str(), role);
        }

        Self { roles }
    }

    pub fn get(&self, name: RoleName) -> Option<&Role> {
        self.roles.get(name.as_str())
    }

    pub fn all(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
