use chrono::{DateTime, TimeDelta, Utc};

/// A message this close to conversation creation is the opening message.
pub const INITIAL_MESSAGE_THRESHOLD_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTiming {
    pub time_diff_ms: i64,
    pub is_initial_message: bool,
}

impl MessageTiming {
    pub fn from_diff_ms(time_diff_ms: i64) -> Self {
        Self {
            time_diff_ms,
            is_initial_message: time_diff_ms <= INITIAL_MESSAGE_THRESHOLD_MS,
        }
    }
}

pub fn message_timing(
    conversation_created_at: DateTime<Utc>,
    message_created_at: DateTime<Utc>,
) -> MessageTiming {
    let diff = message_created_at.signed_duration_since(conversation_created_at);
    // Compared at full precision; the reported millisecond figure truncates.
    MessageTiming {
        time_diff_ms: diff.num_milliseconds(),
        is_initial_message: diff <= TimeDelta::milliseconds(INITIAL_MESSAGE_THRESHOLD_MS),
    }
}
