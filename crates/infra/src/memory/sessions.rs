use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use verihire_auth::Principal;
use verihire_security::credentials::{SessionError, TokenIssuer};

const SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone)]
struct Session {
    principal: Principal,
    expires_at: DateTime<Utc>,
}

/// Opaque bearer-token sessions held in memory.
///
/// Tokens are opaque; nothing about the principal is derivable from the
/// token itself.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenIssuer for InMemorySessionStore {
    async fn issue(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let token = format!(
            "{}{}",
            Uuid::now_v7().simple(),
            Uuid::now_v7().simple()
        );
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError("lock poisoned".to_string()))?;
        sessions.insert(
            token.clone(),
            Session {
                principal: principal.clone(),
                expires_at: now + Duration::hours(SESSION_TTL_HOURS),
            },
        );
        Ok(token)
    }

    async fn validate(&self, token: &str) -> Result<Option<Principal>, SessionError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError("lock poisoned".to_string()))?;
        Ok(sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.principal.clone()))
    }

    async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError("lock poisoned".to_string()))?;
        sessions.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verihire_core::UserId;

    #[tokio::test]
    async fn issued_tokens_validate_until_revoked() {
        let store = InMemorySessionStore::new();
        let principal = Principal::new(UserId::new(), "jane");

        let token = store.issue(&principal, Utc::now()).await.unwrap();
        let found = store.validate(&token).await.unwrap().unwrap();
        assert_eq!(found.user_id, principal.user_id);

        store.revoke(&token).await.unwrap();
        assert!(store.validate(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_do_not_validate() {
        let store = InMemorySessionStore::new();
        let principal = Principal::new(UserId::new(), "jane");
        let issued_at = Utc::now() - Duration::hours(SESSION_TTL_HOURS + 1);
        let token = store.issue(&principal, issued_at).await.unwrap();
        assert!(store.validate(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_tokens_are_rejected() {
        let store = InMemorySessionStore::new();
        assert!(store.validate("nope").await.unwrap().is_none());
    }
}
