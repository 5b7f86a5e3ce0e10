use async_trait::async_trait;
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use super::OutcomeLog;
use crate::types::{ProcessingDecision, ProcessingOutcome};

#[derive(Debug, thiserror::Error)]
pub enum OutcomeError {
    #[error("outcome store error: {0}")]
    Db(sqlx::Error),
    #[error("outcome already recorded for event {0}")]
    AlreadyRecorded(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Parse(String),
}

impl From<sqlx::Error> for OutcomeError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err)
    }
}

#[derive(Debug, Clone)]
pub struct OutcomeCursor {
    pub logged_at: String,
    pub id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListOutcomesParams {
    pub limit: i64,
    pub before: Option<OutcomeCursor>,
    pub decision: Option<ProcessingDecision>,
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ListOutcomesResult {
    pub outcomes: Vec<ProcessingOutcome>,
    pub next_before: Option<OutcomeCursor>,
}

#[derive(Clone)]
pub struct SqliteOutcomeLog {
    pool: SqlitePool,
}

impl SqliteOutcomeLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, event_id: &str) -> Result<ProcessingOutcome, OutcomeError> {
        let row = sqlx::query_as::<_, OutcomeRow>(
            r"
            SELECT
                id,
                event_id,
                conversation_id,
                message_id,
                user_id,
                decision,
                reply_sent,
                handoff_required,
                transferred_to_queue,
                notification_sent,
                conversation_claimed,
                is_initial_message,
                time_diff_ms,
                validation_reason,
                original_text,
                generated_reply,
                logged_at
            FROM processing_outcomes
            WHERE event_id = ?
            ",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OutcomeError::NotFound("outcome not found".to_string()))?;

        row.try_into()
    }

    pub async fn list(&self, params: &ListOutcomesParams) -> Result<ListOutcomesResult, OutcomeError> {
        let mut query = QueryBuilder::new(
            "SELECT \
                id, \
                event_id, \
                conversation_id, \
                message_id, \
                user_id, \
                decision, \
                reply_sent, \
                handoff_required, \
                transferred_to_queue, \
                notification_sent, \
                conversation_claimed, \
                is_initial_message, \
                time_diff_ms, \
                validation_reason, \
                original_text, \
                generated_reply, \
                logged_at \
            FROM processing_outcomes \
            WHERE 1 = 1",
        );

        if let Some(decision) = params.decision {
            query.push(" AND decision = ");
            query.push_bind(decision.as_str());
        }

        if let Some(conversation_id) = params.conversation_id {
            query.push(" AND conversation_id = ");
            query.push_bind(conversation_id);
        }

        if let Some(cursor) = &params.before {
            query.push(" AND (logged_at < ");
            query.push_bind(&cursor.logged_at);
            query.push(" OR (logged_at = ");
            query.push_bind(&cursor.logged_at);
            query.push(" AND id < ");
            query.push_bind(cursor.id.to_string());
            query.push("))");
        }

        query.push(" ORDER BY logged_at DESC, id DESC LIMIT ");
        query.push_bind(params.limit + 1);

        let rows: Vec<OutcomeRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let has_more = rows.len() > params.limit as usize;
        let mut outcomes = Vec::with_capacity(rows.len().min(params.limit as usize));
        for row in rows.into_iter().take(params.limit as usize) {
            outcomes.push(ProcessingOutcome::try_from(row)?);
        }

        let next_before = if has_more {
            outcomes.last().map(|outcome| OutcomeCursor {
                logged_at: outcome.logged_at.clone(),
                id: outcome.id,
            })
        } else {
            None
        };

        Ok(ListOutcomesResult {
            outcomes,
            next_before,
        })
    }
}

#[async_trait]
impl OutcomeLog for SqliteOutcomeLog {
    async fn record(&self, outcome: &ProcessingOutcome) -> Result<(), OutcomeError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processing_outcomes (
                id,
                event_id,
                conversation_id,
                message_id,
                user_id,
                decision,
                reply_sent,
                handoff_required,
                transferred_to_queue,
                notification_sent,
                conversation_claimed,
                is_initial_message,
                time_diff_ms,
                validation_reason,
                original_text,
                generated_reply,
                logged_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(outcome.id.to_string())
        .bind(&outcome.event_id)
        .bind(outcome.conversation_id)
        .bind(&outcome.message_id)
        .bind(&outcome.user_id)
        .bind(outcome.decision.as_str())
        .bind(outcome.reply_sent)
        .bind(outcome.handoff_required)
        .bind(outcome.transferred_to_queue)
        .bind(outcome.notification_sent)
        .bind(outcome.conversation_claimed)
        .bind(outcome.is_initial_message)
        .bind(outcome.time_diff_ms)
        .bind(&outcome.validation_reason)
        .bind(&outcome.original_text)
        .bind(outcome.generated_reply.as_deref())
        .bind(&outcome.logged_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(OutcomeError::AlreadyRecorded(outcome.event_id.clone()))
            }
            Err(err) => Err(OutcomeError::Db(err)),
        }
    }

    async fn exists(&self, event_id: &str) -> Result<bool, OutcomeError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM processing_outcomes WHERE event_id = ? LIMIT 1")
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }
}

#[derive(sqlx::FromRow)]
struct OutcomeRow {
    id: String,
    event_id: String,
    conversation_id: i64,
    message_id: String,
    user_id: String,
    decision: String,
    reply_sent: bool,
    handoff_required: bool,
    transferred_to_queue: bool,
    notification_sent: bool,
    conversation_claimed: bool,
    is_initial_message: bool,
    time_diff_ms: i64,
    validation_reason: String,
    original_text: String,
    generated_reply: Option<String>,
    logged_at: String,
}

impl TryFrom<OutcomeRow> for ProcessingOutcome {
    type Error = OutcomeError;

    fn try_from(row: OutcomeRow) -> Result<Self, Self::Error> {
        let decision = ProcessingDecision::parse(&row.decision)
            .ok_or_else(|| OutcomeError::Parse(format!("unknown decision: {}", row.decision)))?;

        Ok(ProcessingOutcome {
            id: Uuid::parse_str(&row.id)
                .map_err(|err| OutcomeError::Parse(format!("invalid outcome id: {err}")))?,
            event_id: row.event_id,
            conversation_id: row.conversation_id,
            message_id: row.message_id,
            user_id: row.user_id,
            decision,
            reply_sent: row.reply_sent,
            handoff_required: row.handoff_required,
            transferred_to_queue: row.transferred_to_queue,
            notification_sent: row.notification_sent,
            conversation_claimed: row.conversation_claimed,
            is_initial_message: row.is_initial_message,
            time_diff_ms: row.time_diff_ms,
            validation_reason: row.validation_reason,
            original_text: row.original_text,
            generated_reply: row.generated_reply,
            logged_at: row.logged_at,
        })
    }
}
