use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use verihire_auth::Principal;
use verihire_core::UserId;
use verihire_security::credentials::{UserDirectory, UserDirectoryError, UserRecord};

/// User directory held in memory. Passwords are bcrypt-hashed at seed time;
/// plaintext is never retained.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    by_username: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, principal: Principal, password: &str) -> Result<(), UserDirectoryError> {
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| UserDirectoryError(e.to_string()))?;
        let mut users = self
            .by_username
            .write()
            .map_err(|_| UserDirectoryError("lock poisoned".to_string()))?;
        users.insert(
            principal.username.clone(),
            UserRecord {
                principal,
                password_hash,
            },
        );
        Ok(())
    }

    pub fn last_login(&self, username: &str) -> Option<(DateTime<Utc>, String)> {
        let users = self.by_username.read().ok()?;
        let record = users.get(username)?;
        match (&record.principal.last_login, &record.principal.last_login_ip) {
            (Some(at), Some(ip)) => Some((*at, ip.clone())),
            _ => None,
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, UserDirectoryError> {
        let users = self
            .by_username
            .read()
            .map_err(|_| UserDirectoryError("lock poisoned".to_string()))?;
        Ok(users.get(username).cloned())
    }

    async fn record_login(
        &self,
        user: UserId,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<(), UserDirectoryError> {
        let mut users = self
            .by_username
            .write()
            .map_err(|_| UserDirectoryError("lock poisoned".to_string()))?;
        for record in users.values_mut() {
            if record.principal.user_id == user {
                record.principal.last_login = Some(now);
                record.principal.last_login_ip = Some(ip.to_string());
            }
        }
        Ok(())
    }
}
