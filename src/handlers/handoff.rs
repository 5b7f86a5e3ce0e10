use axum::{Json, extract::State};
use serde::Deserialize;

use crate::{
    error::ApiError,
    extractors::ValidQuery,
    state::AppState,
    types::{NegativeResponseResponse, NegativeResponseStatus},
};

#[derive(Debug, Deserialize)]
pub struct NegativeResponseQuery {
    conversation_id: Option<i64>,
    user_id: Option<String>,
}

/// A human answered "no" to the generated reply: hand the conversation to the
/// queue. Transfer failures are reported in the body, not as an error status.
pub async fn responded_false_handler(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<NegativeResponseQuery>,
) -> Result<Json<NegativeResponseResponse>, ApiError> {
    let conversation_id = query
        .conversation_id
        .ok_or_else(|| ApiError::validation("Missing required parameter: conversation_id"))?;
    let user_id = query
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required parameter: user_id"))?;

    let response = match state.chat.transfer_to_queue(conversation_id, &user_id).await {
        Ok(transfer) => {
            tracing::info!(conversation_id, queue_id = ?transfer.queue_id, "negative response, conversation transferred");
            NegativeResponseResponse {
                status: NegativeResponseStatus::ResponseReceivedAndTransferred,
                action: "no".to_string(),
                conversation_id,
                transferred_to_queue: true,
                queue_id: transfer.queue_id,
                error: None,
            }
        }
        Err(err) => {
            tracing::error!(conversation_id, error = %err, "negative response, queue transfer failed");
            NegativeResponseResponse {
                status: NegativeResponseStatus::ResponseReceivedButTransferFailed,
                action: "no".to_string(),
                conversation_id,
                transferred_to_queue: false,
                queue_id: None,
                error: Some(err.to_string()),
            }
        }
    };

    Ok(Json(response))
}
