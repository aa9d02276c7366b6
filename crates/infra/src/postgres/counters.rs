use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};

use verihire_security::rate_limit::{CounterError, CounterStore};

/// Postgres-backed fixed-window counters.
///
/// A single upsert either bumps the live window or restarts a lapsed one;
/// the returned count is the value after the increment.
#[derive(Debug, Clone)]
pub struct PostgresCounterStore {
    pool: Arc<PgPool>,
}

impl PostgresCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    async fn incr(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window_secs: i64,
    ) -> Result<u64, CounterError> {
        let expires = now + Duration::seconds(window_secs);
        let row = sqlx::query(
            r#"
            INSERT INTO rate_counters (key, count, window_expires_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (key) DO UPDATE SET
                count = CASE
                    WHEN rate_counters.window_expires_at <= $3 THEN 1
                    ELSE rate_counters.count + 1
                END,
                window_expires_at = CASE
                    WHEN rate_counters.window_expires_at <= $3 THEN $2
                    ELSE rate_counters.window_expires_at
                END
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(expires)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| CounterError(e.to_string()))?;

        let count: i64 = row.get("count");
        Ok(count as u64)
    }
}
