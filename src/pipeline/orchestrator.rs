use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinError;
use tracing::Instrument;
use uuid::Uuid;

use super::{Disposition, PipelineError, PipelineSettings, Stage};
use crate::{
    clients::{
        ChatPlatform, ContentGenerator, ContextProvider, GeneratedReply, GenerationError,
        GenerationRequest, Notification, Notifier, format_reply,
    },
    clock::format_utc,
    ledger::{Reservation, ReservationLedger},
    outcomes::{OutcomeError, OutcomeLog},
    types::{DuplicateReason, ProcessingDecision, ProcessingOutcome},
    validation::{ValidationPolicy, ValidationResult, WebhookEvent, validate},
};

/// Collaborators an [`Orchestrator`] is built from.
pub struct PipelineParts {
    pub ledger: Arc<dyn ReservationLedger>,
    pub outcomes: Arc<dyn OutcomeLog>,
    pub chat: Arc<dyn ChatPlatform>,
    pub generator: Arc<dyn ContentGenerator>,
    pub notifier: Arc<dyn Notifier>,
    pub context: Option<Arc<dyn ContextProvider>>,
    pub policy: ValidationPolicy,
    pub settings: PipelineSettings,
}

#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn ReservationLedger>,
    outcomes: Arc<dyn OutcomeLog>,
    chat: Arc<dyn ChatPlatform>,
    generator: Arc<dyn ContentGenerator>,
    notifier: Arc<dyn Notifier>,
    context: Option<Arc<dyn ContextProvider>>,
    policy: Arc<ValidationPolicy>,
    settings: Arc<PipelineSettings>,
}

#[derive(Debug, Default, Clone, Copy)]
struct SideEffects {
    conversation_claimed: bool,
    notification_sent: bool,
    reply_sent: bool,
    transferred_to_queue: bool,
}

impl Orchestrator {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            ledger: parts.ledger,
            outcomes: parts.outcomes,
            chat: parts.chat,
            generator: parts.generator,
            notifier: parts.notifier,
            context: parts.context,
            policy: Arc::new(parts.policy),
            settings: Arc::new(parts.settings),
        }
    }

    /// Handles one validated delivery end to end.
    ///
    /// Returns [`Disposition::Duplicate`] without side effects when the event
    /// is already recorded or reserved by another attempt.
    pub async fn handle(&self, event: WebhookEvent) -> Result<Disposition, PipelineError> {
        let event_id = event.event_id.clone();
        tracing::info!(stage = Stage::Received.as_str(), message_id = %event.message_id, "webhook received");

        if self.already_recorded(&event_id).await {
            tracing::info!(stage = Stage::DuplicateRejected.as_str(), "outcome already recorded");
            return Ok(Disposition::Duplicate(DuplicateReason::AlreadyProcessed));
        }

        let token = match self.ledger.try_reserve(&event_id).await {
            Reservation::Acquired(token) => {
                tracing::debug!(stage = Stage::Reserved.as_str(), "reservation acquired");
                token
            }
            Reservation::Held => {
                tracing::info!(stage = Stage::DuplicateRejected.as_str(), "reservation held elsewhere");
                return Ok(Disposition::Duplicate(DuplicateReason::InFlight));
            }
            Reservation::Unavailable => {
                tracing::warn!(stage = Stage::ReservationDenied.as_str(), "ledger unavailable");
                return Err(PipelineError::LedgerUnavailable);
            }
        };

        // A previous holder may have finished and let its token lapse between
        // the first lookup and our reservation.
        if self.already_recorded(&event_id).await {
            tracing::info!(stage = Stage::DuplicateRejected.as_str(), "outcome recorded while reserving");
            return Ok(Disposition::Duplicate(DuplicateReason::AlreadyProcessed));
        }

        let this = self.clone();
        let task = tokio::spawn(async move { this.process(&event).await }.in_current_span());

        let failure = match task.await {
            Ok(Ok(outcome)) => return Ok(Disposition::Recorded(Box::new(outcome))),
            Ok(Err(OutcomeError::AlreadyRecorded(_))) => {
                // Another attempt took over after our token lapsed and recorded
                // first. Side effects may have run twice, but the event is done.
                tracing::warn!(
                    stage = Stage::DuplicateRejected.as_str(),
                    "outcome recorded by another attempt"
                );
                return Ok(Disposition::Duplicate(DuplicateReason::AlreadyProcessed));
            }
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => describe_join_error(join_err),
        };

        tracing::error!(error = %failure, "processing aborted, releasing reservation");
        self.ledger.release(&event_id, &token).await;
        tracing::info!(stage = Stage::Released.as_str(), "reservation released");
        Err(PipelineError::Aborted(failure))
    }

    async fn already_recorded(&self, event_id: &str) -> bool {
        match self.outcomes.exists(event_id).await {
            Ok(found) => found,
            Err(err) => {
                // The reservation still guards against concurrent attempts.
                tracing::warn!(error = %err, "outcome lookup failed");
                false
            }
        }
    }

    /// Runs while holding the reservation. Only a failure to record the
    /// outcome is an error; every collaborator failure before that degrades
    /// to a flag on the outcome.
    async fn process(&self, event: &WebhookEvent) -> Result<ProcessingOutcome, OutcomeError> {
        let validation = validate(&self.policy, event);
        if !validation.should_process {
            tracing::info!(
                stage = Stage::Skipped.as_str(),
                reason = %validation.reason,
                "event ignored"
            );
            let outcome = build_outcome(
                event,
                &validation,
                ProcessingDecision::Ignored,
                SideEffects::default(),
                None,
            );
            return self.record(outcome).await;
        }

        let mut effects = SideEffects {
            conversation_claimed: self.claim(event).await,
            ..SideEffects::default()
        };

        let user_context = self.enrich(event).await;
        let generated = self.generate(event, user_context).await;
        tracing::info!(
            stage = Stage::ContentGenerated.as_str(),
            handoff_required = generated.handoff_required,
            "reply generated"
        );

        effects.notification_sent = self.notify(event, &validation, &generated).await;

        let decision = if generated.handoff_required {
            effects.transferred_to_queue = self.route_to_queue(event).await;
            tracing::info!(
                stage = Stage::HandoffRouted.as_str(),
                transferred = effects.transferred_to_queue,
                "handoff routed"
            );
            ProcessingDecision::ProcessedWithHandoff
        } else {
            effects.reply_sent = self.deliver(event, &generated.reply).await;
            tracing::info!(
                stage = Stage::Delivered.as_str(),
                reply_sent = effects.reply_sent,
                "reply delivered"
            );
            ProcessingDecision::ProcessedAndSent
        };

        let outcome = build_outcome(event, &validation, decision, effects, Some(generated.reply));
        self.record(outcome).await
    }

    async fn record(&self, outcome: ProcessingOutcome) -> Result<ProcessingOutcome, OutcomeError> {
        self.outcomes.record(&outcome).await?;
        tracing::info!(
            stage = Stage::Logged.as_str(),
            decision = outcome.decision.as_str(),
            "outcome recorded"
        );
        Ok(outcome)
    }

    async fn claim(&self, event: &WebhookEvent) -> bool {
        match self
            .chat
            .claim_conversation(event.conversation_id, &self.settings.agent_id, false)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to claim conversation");
                false
            }
        }
    }

    async fn enrich(&self, event: &WebhookEvent) -> Option<String> {
        let provider = self.context.as_ref()?;
        match provider.user_context(&event.author.email).await {
            Ok(Some(context)) => Some(context.summary()),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "user context unavailable");
                None
            }
        }
    }

    async fn generate(&self, event: &WebhookEvent, user_context: Option<String>) -> GeneratedReply {
        let request = GenerationRequest {
            message_text: event.message_text.clone(),
            customer_name: event.display_name().to_string(),
            conversation_id: event.conversation_id,
            user_context,
        };

        let limit = self.settings.generation_timeout;
        let result = match tokio::time::timeout(limit, self.generator.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(limit)),
        };

        match result {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "content generation failed, using placeholder");
                GeneratedReply {
                    reply: format!("Error: content generation failed - {err}"),
                    handoff_required: false,
                }
            }
        }
    }

    async fn notify(
        &self,
        event: &WebhookEvent,
        validation: &ValidationResult,
        generated: &GeneratedReply,
    ) -> bool {
        let notification = Notification {
            sender_email: event.author.email.clone(),
            conversation_id: event.conversation_id,
            original_message: event.message_text.clone(),
            generated_reply: generated.reply.clone(),
            handoff_required: generated.handoff_required,
            is_initial_message: validation.timing.is_initial_message,
        };
        match self.notifier.notify(&notification).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to send notification");
                false
            }
        }
    }

    async fn deliver(&self, event: &WebhookEvent, reply: &str) -> bool {
        let message = format_reply(&self.settings.agent_id, reply);
        match self.chat.send_message(event.conversation_id, &message).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to send reply");
                false
            }
        }
    }

    async fn route_to_queue(&self, event: &WebhookEvent) -> bool {
        match self
            .chat
            .transfer_to_queue(event.conversation_id, &self.settings.agent_id)
            .await
        {
            Ok(transfer) => {
                tracing::debug!(queue_id = ?transfer.queue_id, "conversation transferred");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to transfer conversation to queue");
                false
            }
        }
    }
}

fn build_outcome(
    event: &WebhookEvent,
    validation: &ValidationResult,
    decision: ProcessingDecision,
    effects: SideEffects,
    generated_reply: Option<String>,
) -> ProcessingOutcome {
    ProcessingOutcome {
        id: Uuid::new_v4(),
        event_id: event.event_id.clone(),
        conversation_id: event.conversation_id,
        message_id: event.message_id.clone(),
        user_id: event.author.id.clone(),
        decision,
        reply_sent: effects.reply_sent,
        handoff_required: decision == ProcessingDecision::ProcessedWithHandoff,
        transferred_to_queue: effects.transferred_to_queue,
        notification_sent: effects.notification_sent,
        conversation_claimed: effects.conversation_claimed,
        is_initial_message: validation.timing.is_initial_message,
        time_diff_ms: validation.timing.time_diff_ms,
        validation_reason: validation.reason.clone(),
        original_text: event.message_text.clone(),
        generated_reply,
        logged_at: format_utc(Utc::now()),
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("processing task cancelled: {err}");
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("processing panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("processing panicked: {message}")
    } else {
        "processing panicked".to_string()
    }
}
