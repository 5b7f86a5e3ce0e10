use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    ClientError, Notification, Notifier, SIDE_CHANNEL_TIMEOUT, SlackConfig, http_client,
    status_error,
};

const MESSAGE_PREVIEW_CHARS: usize = 500;
const REPLY_PREVIEW_CHARS: usize = 1_000;

#[derive(Clone)]
pub struct SlackNotifier {
    api_url: String,
    bot_token: String,
    channel_id: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            channel_id: config.channel_id.clone(),
            client: http_client(SIDE_CHANNEL_TIMEOUT),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ClientError> {
        if self.bot_token.is_empty() || self.channel_id.is_empty() {
            return Err(ClientError::Rejected(
                "slack bot token or channel is not configured".to_string(),
            ));
        }

        let body = json!({
            "channel": self.channel_id,
            "text": format!("Generated reply for {}", notification.sender_email),
            "blocks": build_blocks(notification),
        });

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed = response
            .json::<PostMessageResponse>()
            .await
            .map_err(|err| ClientError::Decode(format!("invalid slack response: {err}")))?;
        if !parsed.ok {
            return Err(ClientError::Rejected(
                parsed.error.unwrap_or_else(|| "unknown slack error".to_string()),
            ));
        }

        Ok(())
    }
}

pub fn build_blocks(notification: &Notification) -> Value {
    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": "Generated reply", "emoji": true }
        },
        {
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*User Email:*\n{}", notification.sender_email) },
                { "type": "mrkdwn", "text": format!("*Conversation ID:*\n{}", notification.conversation_id) }
            ]
        },
        { "type": "divider" },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*User Message:*\n```{}```",
                    truncate(&notification.original_message, MESSAGE_PREVIEW_CHARS)
                )
            }
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*Generated Reply:*\n```{}```",
                    truncate(&notification.generated_reply, REPLY_PREVIEW_CHARS)
                )
            }
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*handoff_required:* {}\n*is_initial_message:* {}",
                    notification.handoff_required, notification.is_initial_message
                )
            }
        }
    ])
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
