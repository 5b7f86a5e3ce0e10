use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Outbound agent message in the chat platform's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "agentId")]
    pub agent_id: String,
    pub content: MessageContent,
    #[serde(rename = "_type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageContent {
    #[serde(rename = "_type")]
    pub kind: &'static str,
    pub value: String,
    #[serde(rename = "contentType")]
    pub content_type: &'static str,
}

pub fn format_reply(agent_id: &str, reply: &str) -> OutboundMessage {
    OutboundMessage {
        agent_id: agent_id.to_string(),
        content: MessageContent {
            kind: "Text",
            value: clean_text(reply),
            content_type: "text/html",
        },
        kind: "Outbound",
    }
}

#[allow(clippy::expect_used)]
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line regex is valid"));
#[allow(clippy::expect_used)]
static INLINE_BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("inline blank regex is valid"));

/// Normalizes line endings, collapses blank-line runs to one empty line,
/// squeezes spaces and tabs, and trims.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    let text = INLINE_BLANKS.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_whitespace() {
        assert_eq!(
            clean_text("  Hello   world\r\n\r\n \r\nBye\t\tnow  "),
            "Hello world\n\nBye now"
        );
        assert_eq!(clean_text("line one\nline two"), "line one\nline two");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn outbound_message_wire_shape() {
        let message = format_reply("agent-7", "Thanks!\n\n\nWe will help.");
        let json = serde_json::to_value(&message).expect("serialize");

        assert_eq!(
            json,
            serde_json::json!({
                "agentId": "agent-7",
                "content": {
                    "_type": "Text",
                    "value": "Thanks!\n\nWe will help.",
                    "contentType": "text/html"
                },
                "_type": "Outbound"
            })
        );
    }
}
