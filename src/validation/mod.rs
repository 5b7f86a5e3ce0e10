//! Turns an untrusted webhook payload into a typed event and decides whether
//! business rules allow an automated reply. Everything here is pure.

mod event;
mod policy;
mod timing;

pub use event::{Author, ValidationError, WebhookEvent, parse_event};
pub use policy::{SenderCheck, ValidationPolicy, ValidationResult};
pub use timing::{INITIAL_MESSAGE_THRESHOLD_MS, MessageTiming, message_timing};

/// Runs the timing predicate and the sender policy for one event.
pub fn validate(policy: &ValidationPolicy, event: &WebhookEvent) -> ValidationResult {
    let timing = message_timing(event.conversation_created_at, event.message_created_at);
    policy.should_process(&event.author.email, timing)
}
