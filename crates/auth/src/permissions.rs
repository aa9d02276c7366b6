use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat permission grants for a role.
///
/// Keys are `"{resource}_{action}"` strings (e.g. `"employee_update"`) mapped
/// to booleans. Lookup is exact-key-or-nothing: no inheritance, no wildcard
/// matching. This mirrors how permissions are stored as reference data and is
/// deliberately not a policy language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<String, bool>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical permission key for a (resource, action) pair.
    pub fn key(resource: &str, action: &str) -> String {
        format!("{resource}_{action}")
    }

    /// Grant `resource_action`.
    pub fn grant(mut self, resource: &str, action: &str) -> Self {
        self.0.insert(Self::key(resource, action), true);
        self
    }

    /// Grant a raw key (e.g. `"bulk_operations"`, which has no action part).
    pub fn grant_key(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), true);
        self
    }

    /// Exact-key lookup; missing keys and explicit `false` both deny.
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.allows_key(&Self::key(resource, action))
    }

    pub fn allows_key(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_key_or_nothing() {
        let perms = PermissionSet::new()
            .grant("employee", "retrieve")
            .grant("employee", "update");

        assert!(perms.allows("employee", "retrieve"));
        assert!(perms.allows("employee", "update"));
        assert!(!perms.allows("employee", "destroy"));
        // No prefix/wildcard semantics.
        assert!(!perms.allows("employee", "retr"));
        assert!(!perms.allows_key("employee"));
    }

    #[test]
    fn explicit_false_denies() {
        let mut perms = PermissionSet::new().grant("company", "update");
        perms.0.insert("company_destroy".to_string(), false);
        assert!(!perms.allows("company", "destroy"));
    }
}
