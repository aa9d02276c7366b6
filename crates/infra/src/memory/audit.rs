use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use verihire_audit::store::{
    AuditLogFilter, AuditLogStore, AuditStoreError, SecurityEventFilter, SecurityEventStore,
};
use verihire_audit::{AuditEntry, ResolveError, SecurityEvent, SecurityEventKind};
use verihire_core::{AuditLogId, SecurityEventId, UserId};

/// Append-only audit trail held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous append, used by the in-memory directory store to couple a
    /// mutation with its audit row inside one critical section.
    pub(crate) fn record(&self, entry: AuditEntry) -> AuditLogId {
        let id = entry.id;
        match self.entries.write() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
        id
    }
}

#[async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditLogId, AuditStoreError> {
        Ok(self.record(entry))
    }

    async fn list(&self, filter: AuditLogFilter) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditStoreError::Storage("lock poisoned".to_string()))?;
        let mut out: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| filter.actor.is_none_or(|actor| e.actor.user == Some(actor)))
            .filter(|e| filter.action.is_none_or(|action| e.action == action))
            .filter(|e| filter.since.is_none_or(|since| e.recorded_at >= since))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

/// Security event recorder held in memory.
#[derive(Debug, Default)]
pub struct InMemorySecurityEventStore {
    events: RwLock<Vec<SecurityEvent>>,
}

impl InMemorySecurityEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecurityEventStore for InMemorySecurityEventStore {
    async fn append(&self, event: SecurityEvent) -> Result<SecurityEventId, AuditStoreError> {
        let id = event.id;
        self.events
            .write()
            .map_err(|_| AuditStoreError::Storage("lock poisoned".to_string()))?
            .push(event);
        Ok(id)
    }

    async fn count_recent(
        &self,
        kind: SecurityEventKind,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, AuditStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| AuditStoreError::Storage("lock poisoned".to_string()))?;
        Ok(events
            .iter()
            .filter(|e| e.kind == kind && e.ip.as_deref() == Some(ip) && e.recorded_at >= since)
            .count() as u64)
    }

    async fn list(
        &self,
        filter: SecurityEventFilter,
    ) -> Result<Vec<SecurityEvent>, AuditStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| AuditStoreError::Storage("lock poisoned".to_string()))?;
        let mut out: Vec<SecurityEvent> = events
            .iter()
            .filter(|e| filter.kind.is_none_or(|kind| e.kind == kind))
            .filter(|e| filter.min_severity.is_none_or(|min| e.severity >= min))
            .filter(|e| filter.resolved.is_none_or(|resolved| e.resolved == resolved))
            .filter(|e| filter.since.is_none_or(|since| e.recorded_at >= since))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn resolve(
        &self,
        id: SecurityEventId,
        resolver: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AuditStoreError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| AuditStoreError::Storage("lock poisoned".to_string()))?;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(AuditStoreError::NotFound)?;
        event.resolve(resolver, notes, now).map_err(|e| match e {
            ResolveError::AlreadyResolved => AuditStoreError::AlreadyResolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verihire_audit::{ActorMeta, AuditAction, Severity};

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let store = InMemoryAuditLogStore::new();
        let user = UserId::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(1);

        let mut actor = ActorMeta::system();
        actor.user = Some(user);
        store
            .append(AuditEntry::new(AuditAction::View, actor.clone(), t0))
            .await
            .unwrap();
        store
            .append(AuditEntry::new(AuditAction::Create, actor, t1))
            .await
            .unwrap();
        store
            .append(AuditEntry::new(AuditAction::View, ActorMeta::system(), t1))
            .await
            .unwrap();

        let mine = store
            .list(AuditLogFilter {
                actor: Some(user),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].action, AuditAction::Create);

        let views = store
            .list(AuditLogFilter {
                action: Some(AuditAction::View),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(views.len(), 2);
    }

    #[tokio::test]
    async fn resolve_is_single_shot() {
        let store = InMemorySecurityEventStore::new();
        let now = Utc::now();
        let id = store
            .append(SecurityEvent::new(
                SecurityEventKind::FailedLogin,
                Severity::Medium,
                "failed login",
                now,
            ))
            .await
            .unwrap();

        store
            .resolve(id, UserId::new(), Some("reviewed".to_string()), now)
            .await
            .unwrap();
        let err = store.resolve(id, UserId::new(), None, now).await.unwrap_err();
        assert!(matches!(err, AuditStoreError::AlreadyResolved));

        let err = store
            .resolve(SecurityEventId::new(), UserId::new(), None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AuditStoreError::NotFound));
    }

    #[tokio::test]
    async fn count_recent_scopes_by_ip_and_window() {
        let store = InMemorySecurityEventStore::new();
        let now = Utc::now();
        let old = now - chrono::Duration::minutes(20);
        for ts in [old, now, now] {
            store
                .append(
                    SecurityEvent::new(
                        SecurityEventKind::FailedLogin,
                        Severity::Medium,
                        "failed login",
                        ts,
                    )
                    .ip("203.0.113.5"),
                )
                .await
                .unwrap();
        }
        let since = now - chrono::Duration::minutes(15);
        let count = store
            .count_recent(SecurityEventKind::FailedLogin, "203.0.113.5", since)
            .await
            .unwrap();
        assert_eq!(count, 2);
        let other = store
            .count_recent(SecurityEventKind::FailedLogin, "198.51.100.1", since)
            .await
            .unwrap();
        assert_eq!(other, 0);
    }
}
