use axum::{Json, extract::State};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    extractors::{ValidPath, ValidQuery},
    outcomes::{ListOutcomesParams, OutcomeCursor, OutcomeError},
    state::AppState,
    types::{ListOutcomesResponse, ProcessingDecision, ProcessingOutcome},
};

#[derive(Debug, Deserialize)]
pub struct ListOutcomesQuery {
    limit: Option<i64>,
    before: Option<String>,
    decision: Option<String>,
    conversation_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    logged_at: String,
    id: String,
}

pub async fn list_outcomes_handler(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListOutcomesQuery>,
) -> Result<Json<ListOutcomesResponse>, ApiError> {
    let params = ListOutcomesParams {
        limit: parse_limit(query.limit)?,
        before: query.before.as_deref().map(decode_cursor).transpose()?,
        decision: query.decision.as_deref().map(parse_decision).transpose()?,
        conversation_id: query.conversation_id,
    };

    let result = state
        .outcomes
        .list(&params)
        .await
        .map_err(map_outcome_error)?;
    let next_before = result.next_before.as_ref().map(encode_cursor).transpose()?;

    Ok(Json(ListOutcomesResponse {
        outcomes: result.outcomes,
        next_before,
    }))
}

pub async fn get_outcome_handler(
    State(state): State<AppState>,
    ValidPath(event_id): ValidPath<String>,
) -> Result<Json<ProcessingOutcome>, ApiError> {
    let outcome = state
        .outcomes
        .get(&event_id)
        .await
        .map_err(map_outcome_error)?;
    Ok(Json(outcome))
}

fn parse_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    let limit = limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(ApiError::validation("limit must be between 1 and 200"));
    }
    Ok(limit)
}

fn parse_decision(value: &str) -> Result<ProcessingDecision, ApiError> {
    ProcessingDecision::parse(value).ok_or_else(|| ApiError::validation("decision is invalid"))
}

fn decode_cursor(raw: &str) -> Result<OutcomeCursor, ApiError> {
    let invalid = || ApiError::validation("before must be a valid cursor");

    let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid())?;
    let payload: CursorPayload = serde_json::from_slice(&decoded).map_err(|_| invalid())?;
    DateTime::parse_from_rfc3339(&payload.logged_at).map_err(|_| invalid())?;
    let id = Uuid::parse_str(&payload.id).map_err(|_| invalid())?;

    Ok(OutcomeCursor {
        logged_at: payload.logged_at,
        id,
    })
}

fn encode_cursor(cursor: &OutcomeCursor) -> Result<String, ApiError> {
    let payload = CursorPayload {
        logged_at: cursor.logged_at.clone(),
        id: cursor.id.to_string(),
    };
    let encoded = serde_json::to_vec(&payload)
        .map_err(|_| ApiError::internal("failed to encode cursor"))?;
    Ok(URL_SAFE_NO_PAD.encode(encoded))
}

fn map_outcome_error(err: OutcomeError) -> ApiError {
    match err {
        OutcomeError::Db(db) => ApiError::Db(db),
        OutcomeError::NotFound(message) => ApiError::not_found(message),
        err @ (OutcomeError::AlreadyRecorded(_) | OutcomeError::Parse(_)) => {
            ApiError::internal(err.to_string())
        }
    }
}
