use std::sync::Arc;

use crate::{clients::ChatPlatform, outcomes::SqliteOutcomeLog, pipeline::Orchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Read side of the outcome log, for the audit API.
    pub outcomes: SqliteOutcomeLog,
    pub chat: Arc<dyn ChatPlatform>,
    pub audit_api_token: Option<String>,
}
