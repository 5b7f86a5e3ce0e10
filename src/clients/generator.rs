//! Content generator backed by an asynchronous "run" API: a run is submitted,
//! then polled with exponential backoff until it settles or the deadline
//! passes. Callers see a single awaitable call.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{
    ClientError, ContentGenerator, GeneratedReply, GenerationError, GenerationRequest,
    GeneratorConfig, http_client, status_error,
};

#[derive(Clone)]
pub struct HttpGenerator {
    base_url: String,
    api_key: String,
    prompt_id: String,
    timeout: Duration,
    poll_interval: Duration,
    max_poll_interval: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SubmitRun<'a> {
    prompt_id: &'a str,
    input: RunInput<'a>,
}

#[derive(Serialize)]
struct RunInput<'a> {
    message: &'a str,
    customer_name: &'a str,
    conversation_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_context: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: RunStatus,
    #[serde(default)]
    output: Option<RunOutput>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RunOutput {
    email: String,
    #[serde(default)]
    handoff: bool,
}

impl HttpGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            prompt_id: config.prompt_id.clone(),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
            max_poll_interval: config.max_poll_interval.max(config.poll_interval),
            client: http_client(config.timeout),
        }
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Run, ClientError> {
        let body = SubmitRun {
            prompt_id: &self.prompt_id,
            input: RunInput {
                message: &request.message_text,
                customer_name: &request.customer_name,
                conversation_id: request.conversation_id,
                user_context: request.user_context.as_deref(),
            },
        };

        let response = self
            .client
            .post(format!("{}/runs", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        read_run(response).await
    }

    async fn fetch(&self, run_id: &str) -> Result<Run, ClientError> {
        let response = self
            .client
            .get(format!("{}/runs/{run_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        read_run(response).await
    }

    async fn run_to_completion(
        &self,
        request: &GenerationRequest,
        deadline: Instant,
    ) -> Result<GeneratedReply, GenerationError> {
        let mut run = self.submit(request).await?;
        let mut delay = self.poll_interval;

        loop {
            match run.status {
                RunStatus::Completed => {
                    let output = run.output.ok_or_else(|| {
                        GenerationError::Failed(format!("run {} completed without output", run.id))
                    })?;
                    return Ok(GeneratedReply {
                        reply: output.email,
                        handoff_required: output.handoff,
                    });
                }
                RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired => {
                    let detail = run.error.unwrap_or_else(|| format!("{:?}", run.status));
                    return Err(GenerationError::Failed(detail));
                }
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Unknown => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(GenerationError::Timeout(self.timeout));
            }
            tokio::time::sleep(delay.min(deadline - now)).await;
            delay = (delay * 2).min(self.max_poll_interval);

            tracing::debug!(run_id = %run.id, status = ?run.status, "polling generation run");
            run = self.fetch(&run.id).await?;
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedReply, GenerationError> {
        let deadline = Instant::now() + self.timeout;
        match tokio::time::timeout_at(deadline, self.run_to_completion(request, deadline)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }
}

async fn read_run(response: reqwest::Response) -> Result<Run, ClientError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    response
        .json::<Run>()
        .await
        .map_err(|err| ClientError::Decode(format!("invalid run response: {err}")))
}
