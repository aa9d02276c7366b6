//! Credential verification, login lockout and session issuance.
//!
//! The lockout pre-check runs before any password material is touched: once
//! an IP has accumulated `LOCKOUT_THRESHOLD` failed logins inside the
//! trailing window, further attempts are refused outright, so the lockout
//! response leaks nothing about whether the submitted credentials were valid.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use thiserror::Error;

use verihire_audit::{
    AuditAction, AuditEntry, AuditLogStore, SecurityEvent, SecurityEventKind, SecurityEventStore,
    Severity,
};
use verihire_auth::Principal;
use verihire_core::{LockReason, SecurityError, UserId};

use crate::context::RequestContext;

/// Failed logins from one IP tolerated inside the window.
pub const LOCKOUT_THRESHOLD: u64 = 5;

/// Trailing lockout window.
pub const LOCKOUT_WINDOW_SECS: i64 = 15 * 60;

#[derive(Debug, Error)]
#[error("user directory failure: {0}")]
pub struct UserDirectoryError(pub String);

#[derive(Debug, Error)]
#[error("session store failure: {0}")]
pub struct SessionError(pub String);

/// A stored account: identity plus its bcrypt password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub principal: Principal,
    pub password_hash: String,
}

/// Account lookup and login bookkeeping port.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, UserDirectoryError>;

    /// Record a successful login's timestamp and source IP.
    async fn record_login(
        &self,
        user: UserId,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<(), UserDirectoryError>;
}

/// Opaque session token port.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError>;

    async fn validate(&self, token: &str) -> Result<Option<Principal>, SessionError>;

    async fn revoke(&self, token: &str) -> Result<(), SessionError>;
}

#[async_trait]
impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, UserDirectoryError> {
        (**self).find_by_username(username).await
    }

    async fn record_login(
        &self,
        user: UserId,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<(), UserDirectoryError> {
        (**self).record_login(user, ip, now).await
    }
}

#[async_trait]
impl<S> TokenIssuer for Arc<S>
where
    S: TokenIssuer + ?Sized,
{
    async fn issue(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        (**self).issue(principal, now).await
    }

    async fn validate(&self, token: &str) -> Result<Option<Principal>, SessionError> {
        (**self).validate(token).await
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        (**self).revoke(token).await
    }
}

/// A login failure: either a terminal security outcome or an
/// infrastructure fault the caller surfaces as such.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Denied(#[from] SecurityError),

    #[error("storage failure: {0}")]
    Storage(String),
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub token: String,
}

pub struct CredentialVerifier {
    users: Arc<dyn UserDirectory>,
    tokens: Arc<dyn TokenIssuer>,
    events: Arc<dyn SecurityEventStore>,
    audit: Arc<dyn AuditLogStore>,
}

impl CredentialVerifier {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        tokens: Arc<dyn TokenIssuer>,
        events: Arc<dyn SecurityEventStore>,
        audit: Arc<dyn AuditLogStore>,
    ) -> Self {
        Self {
            users,
            tokens,
            events,
            audit,
        }
    }

    /// Verify credentials and open a session.
    pub async fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, LoginError> {
        self.lockout_precheck(ctx, username, now).await?;

        let record = match self
            .users
            .find_by_username(username)
            .await
            .map_err(|e| LoginError::Storage(e.to_string()))?
        {
            Some(record) => record,
            None => {
                self.record_failed_login(ctx, username, now).await;
                return Err(SecurityError::AuthenticationFailed.into());
            }
        };

        if !bcrypt::verify(password, &record.password_hash).unwrap_or(false) {
            self.record_failed_login(ctx, username, now).await;
            return Err(SecurityError::AuthenticationFailed.into());
        }

        if !record.principal.is_active {
            let event = SecurityEvent::new(
                SecurityEventKind::SuspiciousActivity,
                Severity::High,
                format!("login attempt on deactivated account '{username}'"),
                now,
            )
            .user(record.principal.user_id)
            .ip(ctx.ip.clone());
            self.append_event(event).await;
            return Err(SecurityError::AccountLocked {
                reason: LockReason::Deactivated,
            }
            .into());
        }

        let token = self
            .tokens
            .issue(&record.principal, now)
            .await
            .map_err(|e| LoginError::Storage(e.to_string()))?;

        if let Err(err) = self
            .users
            .record_login(record.principal.user_id, &ctx.ip, now)
            .await
        {
            tracing::warn!(error = %err, "failed to update last-login metadata");
        }

        let mut actor = ctx.actor_meta();
        actor.user = Some(record.principal.user_id);
        let entry = AuditEntry::new(AuditAction::Login, actor, now)
            .description(format!("user '{username}' logged in"));
        if let Err(err) = self.audit.append(entry).await {
            tracing::warn!(error = %err, "failed to append login audit entry");
        }

        Ok(LoginOutcome {
            principal: record.principal,
            token,
        })
    }

    /// Revoke a session token.
    pub async fn logout(
        &self,
        ctx: &RequestContext,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LoginError> {
        self.tokens
            .revoke(token)
            .await
            .map_err(|e| LoginError::Storage(e.to_string()))?;

        let entry = AuditEntry::new(AuditAction::Logout, ctx.actor_meta(), now);
        if let Err(err) = self.audit.append(entry).await {
            tracing::warn!(error = %err, "failed to append logout audit entry");
        }
        Ok(())
    }

    async fn lockout_precheck(
        &self,
        ctx: &RequestContext,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LoginError> {
        let since = now - Duration::seconds(LOCKOUT_WINDOW_SECS);
        let failures = match self
            .events
            .count_recent(SecurityEventKind::FailedLogin, &ctx.ip, since)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(error = %err, "lockout pre-check unavailable, admitting attempt");
                return Ok(());
            }
        };

        if failures < LOCKOUT_THRESHOLD {
            return Ok(());
        }

        let event = SecurityEvent::new(
            SecurityEventKind::AccountLocked,
            Severity::High,
            format!("login blocked for '{username}' after repeated failures"),
            now,
        )
        .ip(ctx.ip.clone())
        .detail("failed_attempts", json!(failures));
        self.append_event(event).await;

        Err(SecurityError::AccountLocked {
            reason: LockReason::TooManyAttempts,
        }
        .into())
    }

    async fn record_failed_login(&self, ctx: &RequestContext, username: &str, now: DateTime<Utc>) {
        let mut event = SecurityEvent::new(
            SecurityEventKind::FailedLogin,
            Severity::Medium,
            format!("failed login attempt for '{username}'"),
            now,
        )
        .ip(ctx.ip.clone())
        .detail("username", json!(username));
        if let Some(agent) = &ctx.user_agent {
            event = event.user_agent(agent.clone());
        }
        self.append_event(event).await;
    }

    async fn append_event(&self, event: SecurityEvent) {
        if let Err(err) = self.events.append(event).await {
            tracing::warn!(error = %err, "failed to record security event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use verihire_audit::store::{AuditLogFilter, AuditStoreError, SecurityEventFilter};
    use verihire_core::{AuditLogId, SecurityEventId};

    #[derive(Default)]
    struct MemEvents {
        events: Mutex<Vec<SecurityEvent>>,
    }

    impl MemEvents {
        fn of_kind(&self, kind: SecurityEventKind) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.kind == kind)
                .count()
        }
    }

    #[async_trait]
    impl SecurityEventStore for MemEvents {
        async fn append(&self, event: SecurityEvent) -> Result<SecurityEventId, AuditStoreError> {
            let id = event.id;
            self.events.lock().unwrap().push(event);
            Ok(id)
        }

        async fn count_recent(
            &self,
            kind: SecurityEventKind,
            ip: &str,
            since: DateTime<Utc>,
        ) -> Result<u64, AuditStoreError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.kind == kind && e.ip.as_deref() == Some(ip) && e.recorded_at >= since)
                .count() as u64)
        }

        async fn list(
            &self,
            _filter: SecurityEventFilter,
        ) -> Result<Vec<SecurityEvent>, AuditStoreError> {
            Ok(self.events.lock().unwrap().clone())
        }

        async fn resolve(
            &self,
            _id: SecurityEventId,
            _resolver: UserId,
            _notes: Option<String>,
            _now: DateTime<Utc>,
        ) -> Result<(), AuditStoreError> {
            Err(AuditStoreError::NotFound)
        }
    }

    #[derive(Default)]
    struct MemAudit {
        entries: Mutex<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl AuditLogStore for MemAudit {
        async fn append(&self, entry: AuditEntry) -> Result<AuditLogId, AuditStoreError> {
            let id = entry.id;
            self.entries.lock().unwrap().push(entry);
            Ok(id)
        }

        async fn list(&self, _filter: AuditLogFilter) -> Result<Vec<AuditEntry>, AuditStoreError> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    struct MemUsers {
        records: HashMap<String, UserRecord>,
        lookups: AtomicUsize,
        logins: Mutex<Vec<(UserId, String)>>,
    }

    impl MemUsers {
        fn with(records: Vec<(&str, UserRecord)>) -> Self {
            Self {
                records: records
                    .into_iter()
                    .map(|(name, rec)| (name.to_string(), rec))
                    .collect(),
                lookups: AtomicUsize::new(0),
                logins: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for MemUsers {
        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserRecord>, UserDirectoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.get(username).cloned())
        }

        async fn record_login(
            &self,
            user: UserId,
            ip: &str,
            _now: DateTime<Utc>,
        ) -> Result<(), UserDirectoryError> {
            self.logins.lock().unwrap().push((user, ip.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemTokens {
        issued: AtomicUsize,
    }

    #[async_trait]
    impl TokenIssuer for MemTokens {
        async fn issue(
            &self,
            _principal: &Principal,
            _now: DateTime<Utc>,
        ) -> Result<String, SessionError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{n}"))
        }

        async fn validate(&self, _token: &str) -> Result<Option<Principal>, SessionError> {
            Ok(None)
        }

        async fn revoke(&self, _token: &str) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::capture(Some("203.0.113.5"), None, None, None, Utc::now())
    }

    fn hash(password: &str) -> String {
        bcrypt::hash(password, 4).unwrap()
    }

    fn record(active: bool) -> UserRecord {
        let mut principal = Principal::new(UserId::new(), "jane");
        if !active {
            principal = principal.deactivated();
        }
        UserRecord {
            principal,
            password_hash: hash("hunter2"),
        }
    }

    fn verifier(
        users: Arc<MemUsers>,
        events: Arc<MemEvents>,
        audit: Arc<MemAudit>,
    ) -> CredentialVerifier {
        CredentialVerifier::new(
            users as Arc<dyn UserDirectory>,
            Arc::new(MemTokens::default()) as Arc<dyn TokenIssuer>,
            events as Arc<dyn SecurityEventStore>,
            audit as Arc<dyn AuditLogStore>,
        )
    }

    #[tokio::test]
    async fn successful_login_issues_a_token_and_audits() {
        let users = Arc::new(MemUsers::with(vec![("jane", record(true))]));
        let events = Arc::new(MemEvents::default());
        let audit = Arc::new(MemAudit::default());
        let v = verifier(users.clone(), events.clone(), audit.clone());

        let outcome = v.login(&ctx(), "jane", "hunter2", Utc::now()).await.unwrap();
        assert_eq!(outcome.token, "token-0");
        assert_eq!(outcome.principal.username, "jane");

        assert_eq!(users.logins.lock().unwrap().len(), 1);
        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Login);
        assert_eq!(entries[0].actor.user, Some(outcome.principal.user_id));
    }

    #[tokio::test]
    async fn wrong_password_records_a_failed_login_event() {
        let users = Arc::new(MemUsers::with(vec![("jane", record(true))]));
        let events = Arc::new(MemEvents::default());
        let v = verifier(users, events.clone(), Arc::new(MemAudit::default()));

        let err = v.login(&ctx(), "jane", "wrong", Utc::now()).await.unwrap_err();
        match err {
            LoginError::Denied(SecurityError::AuthenticationFailed) => {}
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
        assert_eq!(events.of_kind(SecurityEventKind::FailedLogin), 1);
    }

    #[tokio::test]
    async fn unknown_user_is_indistinguishable_from_wrong_password() {
        let users = Arc::new(MemUsers::with(vec![]));
        let events = Arc::new(MemEvents::default());
        let v = verifier(users, events.clone(), Arc::new(MemAudit::default()));

        let err = v.login(&ctx(), "ghost", "pw", Utc::now()).await.unwrap_err();
        match err {
            LoginError::Denied(SecurityError::AuthenticationFailed) => {}
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
        assert_eq!(events.of_kind(SecurityEventKind::FailedLogin), 1);
    }

    #[tokio::test]
    async fn lockout_blocks_before_credentials_are_checked() {
        let users = Arc::new(MemUsers::with(vec![("jane", record(true))]));
        let events = Arc::new(MemEvents::default());
        let now = Utc::now();
        for _ in 0..LOCKOUT_THRESHOLD {
            events
                .append(
                    SecurityEvent::new(
                        SecurityEventKind::FailedLogin,
                        Severity::Medium,
                        "failed login attempt for 'jane'",
                        now,
                    )
                    .ip("203.0.113.5"),
                )
                .await
                .unwrap();
        }
        let v = verifier(users.clone(), events.clone(), Arc::new(MemAudit::default()));

        // Correct credentials, still refused.
        let err = v.login(&ctx(), "jane", "hunter2", now).await.unwrap_err();
        match err {
            LoginError::Denied(SecurityError::AccountLocked {
                reason: LockReason::TooManyAttempts,
            }) => {}
            other => panic!("expected AccountLocked, got {other:?}"),
        }

        assert_eq!(users.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(events.of_kind(SecurityEventKind::AccountLocked), 1);
        // The blocked attempt itself is not a new failed login.
        assert_eq!(
            events.of_kind(SecurityEventKind::FailedLogin),
            LOCKOUT_THRESHOLD as usize
        );
    }

    #[tokio::test]
    async fn failures_outside_the_window_do_not_lock() {
        let users = Arc::new(MemUsers::with(vec![("jane", record(true))]));
        let events = Arc::new(MemEvents::default());
        let now = Utc::now();
        let stale = now - Duration::seconds(LOCKOUT_WINDOW_SECS + 1);
        for _ in 0..LOCKOUT_THRESHOLD {
            events
                .append(
                    SecurityEvent::new(
                        SecurityEventKind::FailedLogin,
                        Severity::Medium,
                        "failed login attempt for 'jane'",
                        stale,
                    )
                    .ip("203.0.113.5"),
                )
                .await
                .unwrap();
        }
        let v = verifier(users, events, Arc::new(MemAudit::default()));
        v.login(&ctx(), "jane", "hunter2", now).await.unwrap();
    }

    #[tokio::test]
    async fn deactivated_account_is_reported_as_such() {
        let users = Arc::new(MemUsers::with(vec![("jane", record(false))]));
        let events = Arc::new(MemEvents::default());
        let v = verifier(users, events.clone(), Arc::new(MemAudit::default()));

        let err = v.login(&ctx(), "jane", "hunter2", Utc::now()).await.unwrap_err();
        match err {
            LoginError::Denied(SecurityError::AccountLocked {
                reason: LockReason::Deactivated,
            }) => {}
            other => panic!("expected deactivated lock, got {other:?}"),
        }
        assert_eq!(events.of_kind(SecurityEventKind::SuspiciousActivity), 1);
    }

    #[tokio::test]
    async fn logout_audits_the_session_end() {
        let audit = Arc::new(MemAudit::default());
        let v = verifier(
            Arc::new(MemUsers::with(vec![])),
            Arc::new(MemEvents::default()),
            audit.clone(),
        );
        v.logout(&ctx(), "token-0", Utc::now()).await.unwrap();
        let entries = audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Logout);
    }
}
