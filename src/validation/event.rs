use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::types::WebhookPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// A validated delivery. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub event_id: String,
    pub conversation_id: i64,
    pub message_id: String,
    pub author: Author,
    pub message_text: String,
    pub conversation_created_at: DateTime<Utc>,
    pub message_created_at: DateTime<Utc>,
}

impl WebhookEvent {
    /// Name used to address the sender, with a neutral fallback.
    pub fn display_name(&self) -> &str {
        self.author
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("customer")
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be an ISO-8601 timestamp, got {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
}

pub fn parse_event(payload: WebhookPayload) -> Result<WebhookEvent, ValidationError> {
    let event_id = required("event_id", payload.event_id)?;
    let data = payload.data;
    let message_id = required("data.message_id", data.message_id)?;
    let author_id = required("data.author.id", data.author.id)?;
    let email = required("data.author.email", data.author.email)?;

    let conversation_created_at =
        parse_timestamp("data.conversation.created_at", &data.conversation.created_at)?;
    let message_created_at = parse_timestamp("data.created_at", &data.created_at)?;

    Ok(WebhookEvent {
        event_id,
        conversation_id: data.conversation.csid,
        message_id,
        author: Author {
            id: author_id,
            email,
            name: data.author.name,
        },
        message_text: data.text,
        conversation_created_at,
        message_created_at,
    })
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// RFC 3339 with offset, or a naive timestamp read as UTC.
fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthorRef, ConversationRef, MessageData};

    fn payload() -> WebhookPayload {
        WebhookPayload {
            event_id: "evt-1".to_string(),
            event_fqn: None,
            event_timestamp: None,
            data: MessageData {
                conversation: ConversationRef {
                    csid: 42,
                    created_at: "2024-03-01T10:00:00Z".to_string(),
                },
                author: AuthorRef {
                    id: "user-1".to_string(),
                    email: "agent@example.com".to_string(),
                    name: None,
                },
                created_at: "2024-03-01T10:00:02.500+00:00".to_string(),
                message_id: "msg-1".to_string(),
                text: "hello".to_string(),
            },
        }
    }

    #[test]
    fn parses_offsets_and_defaults_name() {
        let event = parse_event(payload()).expect("parse event");
        assert_eq!(event.conversation_id, 42);
        assert_eq!(
            (event.message_created_at - event.conversation_created_at).num_milliseconds(),
            2_500
        );
        assert_eq!(event.display_name(), "customer");
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let mut raw = payload();
        raw.data.created_at = "2024-03-01T10:00:04.000".to_string();
        let event = parse_event(raw).expect("parse event");
        assert_eq!(
            (event.message_created_at - event.conversation_created_at).num_milliseconds(),
            4_000
        );
    }

    #[test]
    fn blank_event_id_is_rejected() {
        let mut raw = payload();
        raw.event_id = "  ".to_string();
        assert_eq!(
            parse_event(raw),
            Err(ValidationError::MissingField("event_id"))
        );
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let mut raw = payload();
        raw.data.conversation.created_at = "yesterday".to_string();
        assert!(matches!(
            parse_event(raw),
            Err(ValidationError::InvalidTimestamp {
                field: "data.conversation.created_at",
                ..
            })
        ));
    }
}
