use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use verihire_security::rate_limit::{CounterError, CounterStore};

/// Fixed-window counters held in memory.
///
/// Each key holds `(count, window_expires_at)`; an increment past the expiry
/// restarts the window at 1.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: RwLock<HashMap<String, (u64, DateTime<Utc>)>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window_secs: i64,
    ) -> Result<u64, CounterError> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| CounterError("lock poisoned".to_string()))?;
        let expires = now + Duration::seconds(window_secs);
        let entry = counters.entry(key.to_string()).or_insert((0, expires));
        if now >= entry.1 {
            *entry = (0, expires);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}
