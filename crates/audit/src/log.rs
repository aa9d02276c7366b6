//! Audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use verihire_core::{AuditLogId, UserId};

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    Export,
    Login,
    Logout,
    BulkImport,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::View => "VIEW",
            AuditAction::Export => "EXPORT",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::BulkImport => "BULK_IMPORT",
        }
    }

    /// Whether entries of this kind must share the transaction of the
    /// mutation they describe. VIEW/EXPORT/LOGIN/LOGOUT are fire-and-forget.
    pub fn is_transactional(&self) -> bool {
        matches!(
            self,
            AuditAction::Create | AuditAction::Update | AuditAction::Delete
        )
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the entity an entry describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub table: String,
    pub record_id: String,
}

impl EntityRef {
    pub fn new(table: impl Into<String>, record_id: impl std::fmt::Display) -> Self {
        Self {
            table: table.into(),
            record_id: record_id.to_string(),
        }
    }
}

/// Actor metadata resolved from the active request context.
///
/// A `None` user is recorded as the system itself (scheduled jobs, seeds).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorMeta {
    pub user: Option<UserId>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub session_key: Option<String>,
}

impl ActorMeta {
    pub fn system() -> Self {
        Self::default()
    }
}

/// Derive the changed-field list from two snapshots.
///
/// A field counts as changed when its value in `new` differs from `old`,
/// including fields absent from `old`. Fields present only in `old` are not
/// listed; the diff scans the keys of the new snapshot.
pub fn changed_fields(old: &Map<String, JsonValue>, new: &Map<String, JsonValue>) -> Vec<String> {
    new.iter()
        .filter(|(key, value)| old.get(key.as_str()) != Some(value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// One immutable audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditLogId,
    pub action: AuditAction,
    pub entity: Option<EntityRef>,
    pub old_values: Option<Map<String, JsonValue>>,
    pub new_values: Option<Map<String, JsonValue>>,
    pub changed_fields: Vec<String>,
    pub actor: ActorMeta,
    pub description: Option<String>,
    pub extra: Map<String, JsonValue>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, actor: ActorMeta, now: DateTime<Utc>) -> Self {
        Self {
            id: AuditLogId::new(),
            action,
            entity: None,
            old_values: None,
            new_values: None,
            changed_fields: Vec::new(),
            actor,
            description: None,
            extra: Map::new(),
            recorded_at: now,
        }
    }

    pub fn entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attach before/after snapshots; `changed_fields` is derived when both
    /// are supplied.
    pub fn snapshots(
        mut self,
        old_values: Option<Map<String, JsonValue>>,
        new_values: Option<Map<String, JsonValue>>,
    ) -> Self {
        if let (Some(old), Some(new)) = (&old_values, &new_values) {
            self.changed_fields = changed_fields(old, new);
        }
        self.old_values = old_values;
        self.new_values = new_values;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Display name for the acting principal; `None` is the system.
    pub fn actor_display(&self) -> String {
        match self.actor.user {
            Some(user) => user.to_string(),
            None => "system".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, JsonValue)]) -> Map<String, JsonValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn changed_fields_counts_absent_from_old_as_changed() {
        let old = map(&[("role", json!("A"))]);
        let new = map(&[("role", json!("B")), ("dept", json!("X"))]);

        let mut fields = changed_fields(&old, &new);
        fields.sort();
        assert_eq!(fields, vec!["dept".to_string(), "role".to_string()]);
    }

    #[test]
    fn unchanged_values_are_not_listed() {
        let old = map(&[("name", json!("n")), ("email", json!("e"))]);
        let new = map(&[("name", json!("n")), ("email", json!("f"))]);
        assert_eq!(changed_fields(&old, &new), vec!["email".to_string()]);
    }

    #[test]
    fn snapshots_derive_changed_fields_only_when_both_present() {
        let actor = ActorMeta::system();
        let new = map(&[("name", json!("n"))]);

        let create = AuditEntry::new(AuditAction::Create, actor.clone(), Utc::now())
            .snapshots(None, Some(new.clone()));
        assert!(create.changed_fields.is_empty());

        let update = AuditEntry::new(AuditAction::Update, actor, Utc::now())
            .snapshots(Some(Map::new()), Some(new));
        assert_eq!(update.changed_fields, vec!["name".to_string()]);
    }

    #[test]
    fn null_principal_is_recorded_as_system() {
        let entry = AuditEntry::new(AuditAction::BulkImport, ActorMeta::system(), Utc::now());
        assert_eq!(entry.actor_display(), "system");
    }

    #[test]
    fn login_and_logout_are_fire_and_forget() {
        assert!(AuditAction::Create.is_transactional());
        assert!(AuditAction::Delete.is_transactional());
        assert!(!AuditAction::Login.is_transactional());
        assert!(!AuditAction::View.is_transactional());
        assert!(!AuditAction::BulkImport.is_transactional());
    }
}
