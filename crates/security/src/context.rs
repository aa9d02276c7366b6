use chrono::{DateTime, Utc};

use verihire_audit::ActorMeta;
use verihire_auth::Principal;
use verihire_core::UserId;

/// Immutable per-request snapshot of who is calling from where.
///
/// Captured once at the edge and carried explicitly through the pipeline;
/// there is no ambient request state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub ip: String,
    pub user_agent: Option<String>,
    pub session_key: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    /// Build a context from connection data.
    ///
    /// Client IP policy: the first `X-Forwarded-For` entry when present,
    /// otherwise the peer address. The forwarded header is spoofable by
    /// direct clients, so per-IP throttling and lockout are approximate
    /// behind untrusted edges.
    pub fn capture(
        peer_addr: Option<&str>,
        forwarded_for: Option<&str>,
        user_agent: Option<&str>,
        session_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let ip = forwarded_for
            .and_then(|h| h.split(',').next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .or(peer_addr)
            .unwrap_or("unknown")
            .to_string();

        Self {
            principal: None,
            ip,
            user_agent: user_agent.map(str::to_string),
            session_key: session_key.map(str::to_string),
            received_at: now,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal.as_ref().map(|p| p.user_id)
    }

    /// Actor metadata for audit rows written on behalf of this request.
    pub fn actor_meta(&self) -> ActorMeta {
        ActorMeta {
            user: self.user_id(),
            ip: Some(self.ip.clone()),
            user_agent: self.user_agent.clone(),
            session_key: self.session_key.clone(),
        }
    }
}
