//! Security events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use verihire_core::{SecurityEventId, UserId};

/// Classification of a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    FailedLogin,
    AccountLocked,
    SuspiciousActivity,
    UnauthorizedAccess,
    PrivilegeEscalation,
    AdminAction,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::FailedLogin => "failed_login",
            SecurityEventKind::AccountLocked => "account_locked",
            SecurityEventKind::SuspiciousActivity => "suspicious_activity",
            SecurityEventKind::UnauthorizedAccess => "unauthorized_access",
            SecurityEventKind::PrivilegeEscalation => "privilege_escalation",
            SecurityEventKind::AdminAction => "admin_action",
        }
    }
}

impl core::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("event is already resolved")]
    AlreadyResolved,
}

/// An immutable record of suspicious or violating activity.
///
/// Append-only; the resolution fields are the only mutable projection, set
/// once by an explicit administrative action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: SecurityEventId,
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub user: Option<UserId>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub description: String,
    pub details: Map<String, JsonValue>,
    pub resolved: bool,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(
        kind: SecurityEventKind,
        severity: Severity,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SecurityEventId::new(),
            kind,
            severity,
            user: None,
            ip: None,
            user_agent: None,
            description: description.into(),
            details: Map::new(),
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
            recorded_at: now,
        }
    }

    pub fn user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Mark resolved. Sets resolver, timestamp and notes together; a second
    /// call fails.
    pub fn resolve(
        &mut self,
        resolver: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ResolveError> {
        if self.resolved {
            return Err(ResolveError::AlreadyResolved);
        }
        self.resolved = true;
        self.resolved_by = Some(resolver);
        self.resolved_at = Some(now);
        self.resolution_notes = notes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_sets_all_resolution_fields() {
        let now = Utc::now();
        let mut event = SecurityEvent::new(
            SecurityEventKind::FailedLogin,
            Severity::Medium,
            "failed login attempt",
            now,
        );
        let resolver = UserId::new();

        event
            .resolve(resolver, Some("false positive".to_string()), now)
            .unwrap();

        assert!(event.resolved);
        assert_eq!(event.resolved_by, Some(resolver));
        assert_eq!(event.resolved_at, Some(now));
        assert_eq!(event.resolution_notes.as_deref(), Some("false positive"));
    }

    #[test]
    fn second_resolve_fails() {
        let now = Utc::now();
        let mut event = SecurityEvent::new(
            SecurityEventKind::SuspiciousActivity,
            Severity::High,
            "rate limit exceeded",
            now,
        );
        event.resolve(UserId::new(), None, now).unwrap();

        let err = event.resolve(UserId::new(), None, now).unwrap_err();
        assert_eq!(err, ResolveError::AlreadyResolved);
    }

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }
}
