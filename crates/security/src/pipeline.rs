//! Single facade over the per-request security layers.
//!
//! Handlers call this instead of wiring the limiter, catalog and stores
//! themselves. Denials are terminal for the request; recorder failures for
//! fire-and-forget writes are logged and never surfaced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use verihire_audit::{
    AuditEntry, AuditLogStore, SecurityEvent, SecurityEventKind, SecurityEventStore, Severity,
};
use verihire_auth::{authorize, Principal, RoleCatalog, TenantScoped};
use verihire_core::SecurityError;

use crate::context::RequestContext;
use crate::rate_limit::RateLimiter;

pub struct SecurityPipeline {
    limiter: RateLimiter,
    catalog: RoleCatalog,
    audit: Arc<dyn AuditLogStore>,
    events: Arc<dyn SecurityEventStore>,
}

impl SecurityPipeline {
    pub fn new(
        limiter: RateLimiter,
        catalog: RoleCatalog,
        audit: Arc<dyn AuditLogStore>,
        events: Arc<dyn SecurityEventStore>,
    ) -> Self {
        Self {
            limiter,
            catalog,
            audit,
            events,
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    pub async fn check_rate_limit(
        &self,
        ctx: &RequestContext,
        path: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SecurityError> {
        self.limiter.check(ctx, path, now).await
    }

    /// Permission plus tenant-ownership check. A denial is recorded as an
    /// `UnauthorizedAccess` event before it is returned.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        principal: &Principal,
        resource: &str,
        action: &str,
        object: Option<&(dyn TenantScoped + Sync)>,
        now: DateTime<Utc>,
    ) -> Result<(), SecurityError> {
        match authorize(
            principal,
            &self.catalog,
            resource,
            action,
            object.map(|o| o as &dyn TenantScoped),
        ) {
            Ok(()) => Ok(()),
            Err(err) => {
                let event = SecurityEvent::new(
                    SecurityEventKind::UnauthorizedAccess,
                    Severity::Medium,
                    format!(
                        "'{}' denied {}_{}",
                        principal.username, resource, action
                    ),
                    now,
                )
                .user(principal.user_id)
                .ip(ctx.ip.clone())
                .detail("resource", json!(resource))
                .detail("action", json!(action));
                self.log_event(event).await;
                Err(err)
            }
        }
    }

    /// Fire-and-forget audit append, for actions outside a store transaction
    /// (VIEW, EXPORT and the like).
    pub async fn log(&self, entry: AuditEntry) {
        if let Err(err) = self.audit.append(entry).await {
            tracing::warn!(error = %err, "failed to append audit entry");
        }
    }

    /// Fire-and-forget security event append.
    pub async fn log_event(&self, event: SecurityEvent) {
        if let Err(err) = self.events.append(event).await {
            tracing::warn!(error = %err, "failed to record security event");
        }
    }
}
