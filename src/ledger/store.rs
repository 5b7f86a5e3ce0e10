use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::{LedgerConfig, Reservation, ReservationLedger, ReservationToken};
use crate::clock::format_utc;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("reservation store error: {0}")]
    Db(#[from] sqlx::Error),
}

/// SQLite-backed ledger. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
    ttl: Duration,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool, config: &LedgerConfig) -> Self {
        Self::with_ttl(pool, StdDuration::from_millis(config.reservation_ttl_ms))
    }

    pub fn with_ttl(pool: SqlitePool, ttl: StdDuration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(3));
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Inserts a token, or takes over one whose expiry has passed, in a single
    /// statement. Returns the owning token when this call won.
    pub async fn reserve_at(
        &self,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ReservationToken>, LedgerError> {
        let token = ReservationToken::new();
        let now_str = format_utc(now);
        let expires_at = format_utc(now + self.ttl);

        let result = sqlx::query(
            r#"
            INSERT INTO event_reservations (event_id, owner, reserved_at, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(event_id) DO UPDATE SET
                owner = excluded.owner,
                reserved_at = excluded.reserved_at,
                expires_at = excluded.expires_at
            WHERE event_reservations.expires_at <= ?
            "#,
        )
        .bind(event_id)
        .bind(token.owner())
        .bind(&now_str)
        .bind(&expires_at)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() == 1).then_some(token))
    }

    /// Deletes the token only while `token` still owns it.
    pub async fn delete(
        &self,
        event_id: &str,
        token: &ReservationToken,
    ) -> Result<bool, LedgerError> {
        let result =
            sqlx::query("DELETE FROM event_reservations WHERE event_id = ? AND owner = ?")
                .bind(event_id)
                .bind(token.owner())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, LedgerError> {
        let result = sqlx::query("DELETE FROM event_reservations WHERE expires_at <= ?")
            .bind(format_utc(now))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ReservationLedger for SqliteLedger {
    async fn try_reserve(&self, event_id: &str) -> Reservation {
        match self.reserve_at(event_id, Utc::now()).await {
            Ok(Some(token)) => Reservation::Acquired(token),
            Ok(None) => Reservation::Held,
            Err(err) => {
                tracing::error!(event_id, error = %err, "reservation ledger unavailable");
                Reservation::Unavailable
            }
        }
    }

    async fn release(&self, event_id: &str, token: &ReservationToken) {
        match self.delete(event_id, token).await {
            Ok(true) => tracing::debug!(event_id, "reservation released"),
            Ok(false) => tracing::debug!(event_id, "reservation no longer owned, nothing released"),
            Err(err) => tracing::warn!(event_id, error = %err, "failed to release reservation"),
        }
    }
}

/// Periodically deletes expired tokens. Expired tokens are already ignored by
/// reservation attempts; this only keeps the table small.
pub fn spawn_sweeper(ledger: SqliteLedger, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match ledger.purge_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "purged expired reservations"),
                Err(err) => tracing::warn!(error = %err, "reservation sweep failed"),
            }
        }
    })
}
