//! Permanent, append-only record of how each event was handled.
//!
//! The record doubles as the duplicate-suppression source of truth: once an
//! outcome exists for an event id, that event is never processed again,
//! whatever its reservation state.

mod store;

use async_trait::async_trait;

use crate::types::ProcessingOutcome;

pub use store::{ListOutcomesParams, ListOutcomesResult, OutcomeCursor, OutcomeError, SqliteOutcomeLog};

#[async_trait]
pub trait OutcomeLog: Send + Sync {
    /// Writes the terminal record. Fails with [`OutcomeError::AlreadyRecorded`]
    /// when the event already has one.
    async fn record(&self, outcome: &ProcessingOutcome) -> Result<(), OutcomeError>;

    /// True for any recorded disposition, not only successful sends.
    async fn exists(&self, event_id: &str) -> Result<bool, OutcomeError>;
}
