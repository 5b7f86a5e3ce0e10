use axum::{Json, extract::State};
use tracing::Instrument;

use crate::{
    error::ApiError,
    extractors::ValidJson,
    pipeline::PipelineError,
    state::AppState,
    telemetry::webhook_span,
    types::{WebhookPayload, WebhookResponse},
    validation::parse_event,
};

pub async fn conversation_started_handler(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<WebhookPayload>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let event = parse_event(payload).map_err(|err| ApiError::validation(err.to_string()))?;

    let span = webhook_span(&event.event_id, event.conversation_id);
    let disposition = state
        .orchestrator
        .handle(event.clone())
        .instrument(span)
        .await
        .map_err(map_pipeline_error)?;

    Ok(Json(disposition.into_response(&event)))
}

fn map_pipeline_error(err: PipelineError) -> ApiError {
    match err {
        PipelineError::LedgerUnavailable => {
            ApiError::unavailable("reservation ledger unavailable, retry later")
        }
        PipelineError::Aborted(message) => {
            ApiError::internal(format!("error processing webhook: {message}"))
        }
    }
}
