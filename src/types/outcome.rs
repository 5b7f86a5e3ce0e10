use serde::{Deserialize, Serialize};
use specta::Type;
use uuid::Uuid;

/// Terminal record of how one event was handled. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ProcessingOutcome {
    pub id: Uuid,
    pub event_id: String,
    pub conversation_id: i64,
    pub message_id: String,
    pub user_id: String,
    pub decision: ProcessingDecision,

    pub reply_sent: bool,
    pub handoff_required: bool,
    pub transferred_to_queue: bool,
    pub notification_sent: bool,
    pub conversation_claimed: bool,

    pub is_initial_message: bool,
    pub time_diff_ms: i64,
    pub validation_reason: String,

    pub original_text: String,
    pub generated_reply: Option<String>,

    pub logged_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingDecision {
    ProcessedAndSent,
    ProcessedWithHandoff,
    Ignored,
}

impl ProcessingDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingDecision::ProcessedAndSent => "processed_and_sent",
            ProcessingDecision::ProcessedWithHandoff => "processed_with_handoff",
            ProcessingDecision::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processed_and_sent" => Some(ProcessingDecision::ProcessedAndSent),
            "processed_with_handoff" => Some(ProcessingDecision::ProcessedWithHandoff),
            "ignored" => Some(ProcessingDecision::Ignored),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ListOutcomesResponse {
    pub outcomes: Vec<ProcessingOutcome>,
    pub next_before: Option<String>,
}
