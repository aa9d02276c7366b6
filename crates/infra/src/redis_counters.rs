//! Redis-backed fixed-window counters, compiled behind the `redis` feature.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use verihire_security::rate_limit::{CounterError, CounterStore};

/// Counter store on Redis. `INCR` is atomic; the expiry is attached when a
/// key's window starts (count transitions to 1).
pub struct RedisCounterStore {
    client: Arc<redis::Client>,
}

impl RedisCounterStore {
    pub fn connect(url: &str) -> Result<Self, CounterError> {
        let client = redis::Client::open(url).map_err(|e| CounterError(e.to_string()))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(
        &self,
        key: &str,
        _now: DateTime<Utc>,
        window_secs: i64,
    ) -> Result<u64, CounterError> {
        let client = self.client.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = client
                .get_connection()
                .map_err(|e| CounterError(e.to_string()))?;
            let count: u64 = redis::cmd("INCR")
                .arg(&key)
                .query(&mut conn)
                .map_err(|e| CounterError(e.to_string()))?;
            if count == 1 {
                let _: i64 = redis::cmd("EXPIRE")
                    .arg(&key)
                    .arg(window_secs)
                    .query(&mut conn)
                    .map_err(|e| CounterError(e.to_string()))?;
            }
            Ok(count)
        })
        .await
        .map_err(|e| CounterError(e.to_string()))?
    }
}
