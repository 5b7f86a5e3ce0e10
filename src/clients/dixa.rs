//! Chat-platform REST client.

use async_trait::async_trait;
use serde::Serialize;

use super::{
    ChatPlatform, ClientError, OutboundMessage, PlatformConfig, QueueTransfer, http_client,
    status_error,
};

#[derive(Clone)]
pub struct DixaClient {
    base_url: String,
    api_key: String,
    queue_id: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ClaimBody<'a> {
    #[serde(rename = "agentId")]
    agent_id: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct TransferBody<'a> {
    #[serde(rename = "queueId")]
    queue_id: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
}

impl DixaClient {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            queue_id: config.queue_id.clone(),
            client: http_client(config.request_timeout),
        }
    }

    fn conversation_url(&self, conversation_id: i64, suffix: &str) -> String {
        format!("{}/conversations/{conversation_id}/{suffix}", self.base_url)
    }
}

#[async_trait]
impl ChatPlatform for DixaClient {
    async fn claim_conversation(
        &self,
        conversation_id: i64,
        agent_id: &str,
        force: bool,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.conversation_url(conversation_id, "claim"))
            .bearer_auth(&self.api_key)
            .json(&ClaimBody { agent_id, force })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn send_message(
        &self,
        conversation_id: i64,
        message: &OutboundMessage,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.conversation_url(conversation_id, "messages"))
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    async fn transfer_to_queue(
        &self,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<QueueTransfer, ClientError> {
        let response = self
            .client
            .put(self.conversation_url(conversation_id, "transfer/queue"))
            .bearer_auth(&self.api_key)
            .json(&TransferBody {
                queue_id: &self.queue_id,
                user_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.bytes().await?;
        let queue_id = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("queueId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .or_else(|| Some(self.queue_id.clone()).filter(|id| !id.is_empty()));

        Ok(QueueTransfer { queue_id })
    }
}
