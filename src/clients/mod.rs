//! Boundaries to the outside world: the chat platform, the content generator,
//! the operational notification channel and the optional user-context source.
//!
//! The pipeline only sees the traits below.

mod config;
mod dashboard;
mod dixa;
mod formatter;
mod generator;
mod slack;

use std::time::Duration;

use async_trait::async_trait;

pub use config::{
    DashboardConfig, GeneratorConfig, PlatformConfig, SIDE_CHANNEL_TIMEOUT, SlackConfig,
};
pub use dashboard::{DashboardClient, UserContext};
pub use dixa::DixaClient;
pub use formatter::{MessageContent, OutboundMessage, clean_text, format_reply};
pub use generator::HttpGenerator;
pub use slack::{SlackNotifier, build_blocks};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTransfer {
    pub queue_id: Option<String>,
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn claim_conversation(
        &self,
        conversation_id: i64,
        agent_id: &str,
        force: bool,
    ) -> Result<(), ClientError>;

    async fn send_message(
        &self,
        conversation_id: i64,
        message: &OutboundMessage,
    ) -> Result<(), ClientError>;

    async fn transfer_to_queue(
        &self,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<QueueTransfer, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub message_text: String,
    pub customer_name: String,
    pub conversation_id: i64,
    pub user_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub reply: String,
    pub handoff_required: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation did not finish within {0:?}")]
    Timeout(Duration),
    #[error("generation failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedReply, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub sender_email: String,
    pub conversation_id: i64,
    pub original_message: String,
    pub generated_reply: String,
    pub handoff_required: bool,
    pub is_initial_message: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), ClientError>;
}

#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// `Ok(None)` when the sender is unknown to the provider.
    async fn user_context(&self, email: &str) -> Result<Option<UserContext>, ClientError>;
}

/// Reads the body of a non-success response into a [`ClientError::Status`].
pub(crate) async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status { status, body }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
