pub mod api_error;
pub mod health;
pub mod outcome;
pub mod webhook;

#[allow(unused_imports)]
pub use api_error::{ApiErrorCode, ApiErrorResponse};
#[allow(unused_imports)]
pub use health::HealthResponse;
#[allow(unused_imports)]
pub use outcome::{ListOutcomesResponse, ProcessingDecision, ProcessingOutcome};
#[allow(unused_imports)]
pub use webhook::{
    AuthorRef, ConversationRef, DuplicateReason, MessageData, NegativeResponseResponse,
    NegativeResponseStatus, WebhookPayload, WebhookResponse,
};
