//! Fixed-window, per-IP request throttling.
//!
//! Windows are keyed `(class, ip)` and never partial: the first request in a
//! window starts it, and the counter expires `WINDOW_SECS` later. Counter
//! storage failures fail open; throttling degrades before availability does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use verihire_audit::{SecurityEvent, SecurityEventKind, SecurityEventStore, Severity};
use verihire_core::SecurityError;

use crate::context::RequestContext;

/// Fixed window length.
pub const WINDOW_SECS: i64 = 60;

/// Throttling class a request path falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitClass {
    /// Login and other credential endpoints.
    Auth,
    /// Bulk mutation endpoints.
    Bulk,
    /// Everything else under the API prefix.
    Api,
}

impl LimitClass {
    /// Requests allowed per window.
    pub fn threshold(&self) -> u64 {
        match self {
            LimitClass::Auth => 10,
            LimitClass::Bulk => 5,
            LimitClass::Api => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LimitClass::Auth => "auth",
            LimitClass::Bulk => "bulk",
            LimitClass::Api => "api",
        }
    }

    /// Classify a request path. Paths outside the `/auth/` and `/api/`
    /// prefixes are not throttled.
    pub fn classify(path: &str) -> Option<Self> {
        if path.starts_with("/auth/") {
            Some(LimitClass::Auth)
        } else if path.starts_with("/api/") {
            if path.contains("/bulk") {
                Some(LimitClass::Bulk)
            } else {
                Some(LimitClass::Api)
            }
        } else {
            None
        }
    }

    fn key(&self, ip: &str) -> String {
        format!("rate_limit:{}:{}", self.as_str(), ip)
    }
}

#[derive(Debug, Error)]
#[error("counter store failure: {0}")]
pub struct CounterError(pub String);

/// Windowed counter port.
///
/// `incr` returns the counter value after incrementing; a key whose window
/// has lapsed restarts at 1 with a fresh expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window_secs: i64,
    ) -> Result<u64, CounterError>;
}

#[async_trait]
impl<S> CounterStore for Arc<S>
where
    S: CounterStore + ?Sized,
{
    async fn incr(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window_secs: i64,
    ) -> Result<u64, CounterError> {
        (**self).incr(key, now, window_secs).await
    }
}

pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    events: Arc<dyn SecurityEventStore>,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, events: Arc<dyn SecurityEventStore>) -> Self {
        Self { counters, events }
    }

    /// Throttle-check `path` for the request. The request over the threshold
    /// is rejected and recorded as a `SuspiciousActivity` event; failures of
    /// the counter store itself admit the request.
    pub async fn check(
        &self,
        ctx: &RequestContext,
        path: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SecurityError> {
        let Some(class) = LimitClass::classify(path) else {
            return Ok(());
        };

        let count = match self.counters.incr(&class.key(&ctx.ip), now, WINDOW_SECS).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(error = %err, class = class.as_str(), "counter store unavailable, admitting request");
                return Ok(());
            }
        };

        if count <= class.threshold() {
            return Ok(());
        }

        let mut event = SecurityEvent::new(
            SecurityEventKind::SuspiciousActivity,
            Severity::Medium,
            format!("rate limit exceeded for class '{}'", class.as_str()),
            now,
        )
        .ip(ctx.ip.clone())
        .detail("class", json!(class.as_str()))
        .detail("count", json!(count))
        .detail("threshold", json!(class.threshold()))
        .detail("path", json!(path));
        if let Some(user) = ctx.user_id() {
            event = event.user(user);
        }
        if let Some(agent) = &ctx.user_agent {
            event = event.user_agent(agent.clone());
        }
        if let Err(err) = self.events.append(event).await {
            tracing::warn!(error = %err, "failed to record rate limit violation event");
        }

        Err(SecurityError::RateLimitExceeded {
            class: class.as_str(),
        })
    }
}
