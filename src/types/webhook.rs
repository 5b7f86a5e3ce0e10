use serde::{Deserialize, Serialize};
use specta::Type;

/// Inbound "conversation message created" delivery.
///
/// Only the fields the pipeline reads are modelled; anything else the
/// platform sends is ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct WebhookPayload {
    pub event_id: String,
    #[serde(default)]
    pub event_fqn: Option<String>,
    #[serde(default)]
    pub event_timestamp: Option<String>,
    pub data: MessageData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct MessageData {
    pub conversation: ConversationRef,
    pub author: AuthorRef,
    pub created_at: String,
    pub message_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ConversationRef {
    #[serde(alias = "id")]
    pub csid: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct AuthorRef {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    /// An outcome is already recorded for the event.
    AlreadyProcessed,
    /// Another attempt holds the reservation right now.
    InFlight,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookResponse {
    ProcessedAndSent {
        event_id: String,
        conversation_id: i64,
        message_id: String,
        is_initial_message: bool,
        reply: String,
        reply_sent: bool,
        notification_sent: bool,
    },
    ProcessedWithHandoff {
        event_id: String,
        conversation_id: i64,
        message_id: String,
        is_initial_message: bool,
        reply: String,
        notification_sent: bool,
        transferred_to_queue: bool,
    },
    Ignored {
        event_id: String,
        conversation_id: i64,
        message_id: String,
        author_email: String,
        is_initial_message: bool,
        validation_reason: String,
    },
    DuplicateIgnored {
        event_id: String,
        conversation_id: i64,
        message_id: String,
        reason: DuplicateReason,
        detail: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
pub enum NegativeResponseStatus {
    ResponseReceivedAndTransferred,
    ResponseReceivedButTransferFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct NegativeResponseResponse {
    pub status: NegativeResponseStatus,
    pub action: String,
    pub conversation_id: i64,
    pub transferred_to_queue: bool,
    pub queue_id: Option<String>,
    pub error: Option<String>,
}
