use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    auth::audit_auth,
    handlers::{
        handoff::responded_false_handler,
        health::health_handler,
        outcomes::{get_outcome_handler, list_outcomes_handler},
        webhook::conversation_started_handler,
    },
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    let audit = Router::new()
        .route("/api/outcomes", get(list_outcomes_handler))
        .route("/api/outcomes/:event_id", get(get_outcome_handler))
        .layer(middleware::from_fn_with_state(state.clone(), audit_auth));

    Router::new()
        .route("/dixa_conversation_started", post(conversation_started_handler))
        .route("/responded_false", get(responded_false_handler))
        .route("/health", get(health_handler))
        .merge(audit)
        .with_state(state)
}
