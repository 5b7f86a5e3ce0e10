//! Exactly-once handling of a single webhook delivery.
//!
//! The [`Orchestrator`] owns the sequence duplicate check, reservation,
//! validation, claim, enrichment, generation, notification, delivery or
//! handoff, and outcome recording. A reservation is only ever released when
//! processing aborts before an outcome is durably recorded.

mod orchestrator;

use std::time::Duration;

use crate::{
    types::{DuplicateReason, ProcessingDecision, ProcessingOutcome, WebhookResponse},
    validation::WebhookEvent,
};

pub use orchestrator::{Orchestrator, PipelineParts};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Agent the conversation is claimed for and replies are sent as.
    pub agent_id: String,
    /// Upper bound for one content generation call.
    pub generation_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            generation_timeout: Duration::from_secs(60),
        }
    }
}

/// Lifecycle states of one delivery, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    DuplicateRejected,
    ReservationDenied,
    Reserved,
    Skipped,
    ContentGenerated,
    Delivered,
    HandoffRouted,
    Logged,
    Released,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::DuplicateRejected => "duplicate_rejected",
            Stage::ReservationDenied => "reservation_denied",
            Stage::Reserved => "reserved",
            Stage::Skipped => "skipped",
            Stage::ContentGenerated => "content_generated",
            Stage::Delivered => "delivered",
            Stage::HandoffRouted => "handoff_routed",
            Stage::Logged => "logged",
            Stage::Released => "released",
        }
    }
}

/// How a delivery ended when the pipeline did not fail.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// Nothing was done. Not persisted.
    Duplicate(DuplicateReason),
    /// An outcome was written for the event.
    Recorded(Box<ProcessingOutcome>),
}

impl Disposition {
    pub fn into_response(self, event: &WebhookEvent) -> WebhookResponse {
        match self {
            Disposition::Duplicate(reason) => WebhookResponse::DuplicateIgnored {
                event_id: event.event_id.clone(),
                conversation_id: event.conversation_id,
                message_id: event.message_id.clone(),
                reason,
                detail: match reason {
                    DuplicateReason::AlreadyProcessed => {
                        "event already has a recorded outcome".to_string()
                    }
                    DuplicateReason::InFlight => {
                        "event is being processed by another request".to_string()
                    }
                },
            },
            Disposition::Recorded(outcome) => {
                let outcome = *outcome;
                match outcome.decision {
                    ProcessingDecision::ProcessedAndSent => WebhookResponse::ProcessedAndSent {
                        event_id: outcome.event_id,
                        conversation_id: outcome.conversation_id,
                        message_id: outcome.message_id,
                        is_initial_message: outcome.is_initial_message,
                        reply: outcome.generated_reply.unwrap_or_default(),
                        reply_sent: outcome.reply_sent,
                        notification_sent: outcome.notification_sent,
                    },
                    ProcessingDecision::ProcessedWithHandoff => {
                        WebhookResponse::ProcessedWithHandoff {
                            event_id: outcome.event_id,
                            conversation_id: outcome.conversation_id,
                            message_id: outcome.message_id,
                            is_initial_message: outcome.is_initial_message,
                            reply: outcome.generated_reply.unwrap_or_default(),
                            notification_sent: outcome.notification_sent,
                            transferred_to_queue: outcome.transferred_to_queue,
                        }
                    }
                    ProcessingDecision::Ignored => WebhookResponse::Ignored {
                        event_id: outcome.event_id,
                        conversation_id: outcome.conversation_id,
                        message_id: outcome.message_id,
                        author_email: event.author.email.clone(),
                        is_initial_message: outcome.is_initial_message,
                        validation_reason: outcome.validation_reason,
                    },
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The ledger could not be consulted. Nothing was done; safe to retry.
    #[error("reservation ledger unavailable")]
    LedgerUnavailable,
    /// Processing failed before an outcome was recorded. The reservation has
    /// been released so a retry may reprocess the event.
    #[error("processing aborted: {0}")]
    Aborted(String),
}
