//! Reservation ledger: short-lived exclusivity markers keyed by event id.
//!
//! A reservation is the only cross-request mutual exclusion in the service.
//! Every backend failure is reported as [`Reservation::Unavailable`], which
//! callers must treat as "do not proceed".

mod config;
mod store;

use async_trait::async_trait;
use uuid::Uuid;

pub use config::LedgerConfig;
pub use store::{LedgerError, SqliteLedger, spawn_sweeper};

/// Identifies the attempt that owns a reservation. Only the owner can
/// release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken(Uuid);

impl ReservationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn owner(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ReservationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// This caller created the token and owns processing of the event.
    Acquired(ReservationToken),
    /// A live token already exists for the event.
    Held,
    /// The ledger could not be reached. Fail closed.
    Unavailable,
}

impl Reservation {
    pub fn is_acquired(self) -> bool {
        matches!(self, Reservation::Acquired(_))
    }
}

#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Atomically creates a token for `event_id` unless a live one exists.
    async fn try_reserve(&self, event_id: &str) -> Reservation;

    /// Removes the token for `event_id` if `token` still owns it. Best effort
    /// and idempotent; a token taken over after expiry is left alone.
    async fn release(&self, event_id: &str, token: &ReservationToken);
}
