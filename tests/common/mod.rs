#![allow(dead_code)]

use std::{
    fs,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use responder::{
    clients::{
        ChatPlatform, ClientError, ContentGenerator, ContextProvider, GeneratedReply,
        GenerationError, GenerationRequest, Notification, Notifier, OutboundMessage,
        QueueTransfer, UserContext,
    },
    ledger::SqliteLedger,
    outcomes::{OutcomeError, OutcomeLog, SqliteOutcomeLog},
    pipeline::{Orchestrator, PipelineParts, PipelineSettings},
    types::ProcessingOutcome,
    validation::{Author, ValidationPolicy, WebhookEvent},
};
use serde_json::{Value, json};
use sqlx::{
    Connection, SqliteConnection, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tempfile::NamedTempFile;

pub const AGENT_ID: &str = "agent-1";

pub struct TestDb {
    pub pool: SqlitePool,
    _db_file: NamedTempFile,
}

pub async fn setup_db(max_connections: u32) -> TestDb {
    let db_file = NamedTempFile::new().expect("create temp sqlite file");
    let options = SqliteConnectOptions::new()
        .filename(db_file.path())
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .expect("connect sqlite for migrations");
    run_migrations_on_conn(&mut conn)
        .await
        .expect("run migrations");
    conn.close().await.expect("close migration conn");

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("connect sqlite file");

    TestDb {
        pool,
        _db_file: db_file,
    }
}

async fn run_migrations_on_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let mut entries: Vec<_> = fs::read_dir("migrations")
        .expect("read migrations dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("sql"))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let contents = fs::read_to_string(entry.path()).expect("read migration");
        for stmt in contents.split(';') {
            let stmt = stmt.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&mut *conn).await?;
            }
        }
    }
    Ok(())
}

pub fn at(offset_ms: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(offset_ms)
}

pub fn event(event_id: &str, email: &str, time_diff_ms: i64) -> WebhookEvent {
    WebhookEvent {
        event_id: event_id.to_string(),
        conversation_id: 4242,
        message_id: format!("msg-{event_id}"),
        author: Author {
            id: "user-7".to_string(),
            email: email.to_string(),
            name: Some("Sam".to_string()),
        },
        message_text: "Where is my order?".to_string(),
        conversation_created_at: at(0),
        message_created_at: at(time_diff_ms),
    }
}

pub fn payload(event_id: &str, email: &str, time_diff_ms: i64) -> Value {
    json!({
        "event_id": event_id,
        "event_fqn": "CONVERSATION_MESSAGE_ADDED",
        "data": {
            "conversation": {
                "csid": 4242,
                "created_at": at(0).to_rfc3339(),
            },
            "author": { "id": "user-7", "email": email, "name": "Sam" },
            "created_at": at(time_diff_ms).to_rfc3339(),
            "message_id": format!("msg-{event_id}"),
            "text": "Where is my order?",
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    Claim { conversation_id: i64, force: bool },
    Send { conversation_id: i64, text: String },
    Transfer { conversation_id: i64, user_id: String },
}

#[derive(Default)]
pub struct MockChat {
    calls: Mutex<Vec<ChatCall>>,
    pub fail_claim: AtomicBool,
    pub fail_send: AtomicBool,
    pub fail_transfer: AtomicBool,
}

impl MockChat {
    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ChatCall::Send { .. }))
            .count()
    }

    pub fn transfers(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ChatCall::Transfer { .. }))
            .count()
    }

    fn push(&self, call: ChatCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn rejected(flag: &AtomicBool, what: &str) -> Result<(), ClientError> {
    if flag.load(Ordering::SeqCst) {
        return Err(ClientError::Status {
            status: 500,
            body: format!("{what} failed"),
        });
    }
    Ok(())
}

#[async_trait]
impl ChatPlatform for MockChat {
    async fn claim_conversation(
        &self,
        conversation_id: i64,
        _agent_id: &str,
        force: bool,
    ) -> Result<(), ClientError> {
        self.push(ChatCall::Claim {
            conversation_id,
            force,
        });
        rejected(&self.fail_claim, "claim")
    }

    async fn send_message(
        &self,
        conversation_id: i64,
        message: &OutboundMessage,
    ) -> Result<(), ClientError> {
        self.push(ChatCall::Send {
            conversation_id,
            text: message.content.value.clone(),
        });
        rejected(&self.fail_send, "send")
    }

    async fn transfer_to_queue(
        &self,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<QueueTransfer, ClientError> {
        self.push(ChatCall::Transfer {
            conversation_id,
            user_id: user_id.to_string(),
        });
        rejected(&self.fail_transfer, "transfer")?;
        Ok(QueueTransfer {
            queue_id: Some("queue-9".to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub enum Generation {
    Reply { text: &'static str, handoff: bool },
    Fail,
    /// Panics on the first call, then replies.
    PanicOnce,
    Hang,
}

pub struct MockGenerator {
    behavior: Generation,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new(behavior: Generation) -> Self {
        Self::with_delay(behavior, Duration::ZERO)
    }

    pub fn with_delay(behavior: Generation, delay: Duration) -> Self {
        Self {
            behavior,
            delay,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &'static str) -> Self {
        Self::new(Generation::Reply {
            text,
            handoff: false,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedReply, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            Generation::Reply { text, handoff } => Ok(GeneratedReply {
                reply: format!("Hi {}, {text}", request.customer_name),
                handoff_required: *handoff,
            }),
            Generation::Fail => Err(GenerationError::Failed("model overloaded".to_string())),
            Generation::PanicOnce if call == 0 => panic!("generator exploded"),
            Generation::PanicOnce => Ok(GeneratedReply {
                reply: format!("Hi {}, recovered", request.customer_name),
                handoff_required: false,
            }),
            Generation::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GenerationError::Failed("unreachable".to_string()))
            }
        }
    }
}

#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<Notification>>,
    pub fail: AtomicBool,
}

impl MockNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), ClientError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected("channel_not_found".to_string()));
        }
        Ok(())
    }
}

/// Context provider with a fixed answer, or a failure when `None`.
pub struct StaticContext(pub Option<Value>);

#[async_trait]
impl ContextProvider for StaticContext {
    async fn user_context(&self, _email: &str) -> Result<Option<UserContext>, ClientError> {
        match &self.0 {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| ClientError::Decode(err.to_string())),
            None => Err(ClientError::Status {
                status: 503,
                body: "dashboard down".to_string(),
            }),
        }
    }
}

/// Outcome log whose writes can be made to fail on demand.
pub struct FlakyOutcomeLog {
    inner: SqliteOutcomeLog,
    pub fail_record: AtomicBool,
    pub record_conflict: AtomicBool,
}

impl FlakyOutcomeLog {
    pub fn new(inner: SqliteOutcomeLog) -> Self {
        Self {
            inner,
            fail_record: AtomicBool::new(false),
            record_conflict: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl OutcomeLog for FlakyOutcomeLog {
    async fn record(&self, outcome: &ProcessingOutcome) -> Result<(), OutcomeError> {
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(OutcomeError::Db(sqlx::Error::PoolTimedOut));
        }
        if self.record_conflict.load(Ordering::SeqCst) {
            return Err(OutcomeError::AlreadyRecorded(outcome.event_id.clone()));
        }
        self.inner.record(outcome).await
    }

    async fn exists(&self, event_id: &str) -> Result<bool, OutcomeError> {
        self.inner.exists(event_id).await
    }
}

pub struct Harness {
    pub db: TestDb,
    pub ledger: SqliteLedger,
    pub outcomes: SqliteOutcomeLog,
    pub flaky: Arc<FlakyOutcomeLog>,
    pub chat: Arc<MockChat>,
    pub generator: Arc<MockGenerator>,
    pub notifier: Arc<MockNotifier>,
    pub orchestrator: Orchestrator,
}

pub fn policy() -> ValidationPolicy {
    ValidationPolicy::new(["example.com"])
}

pub async fn harness(generator: MockGenerator) -> Harness {
    harness_with_timeout(generator, Duration::from_secs(5)).await
}

pub async fn harness_with_timeout(generator: MockGenerator, generation_timeout: Duration) -> Harness {
    harness_with(generator, generation_timeout, None).await
}

pub async fn harness_with(
    generator: MockGenerator,
    generation_timeout: Duration,
    context: Option<Arc<dyn ContextProvider>>,
) -> Harness {
    let db = setup_db(8).await;
    let ledger = SqliteLedger::with_ttl(db.pool.clone(), Duration::from_secs(120));
    let outcomes = SqliteOutcomeLog::new(db.pool.clone());
    let flaky = Arc::new(FlakyOutcomeLog::new(outcomes.clone()));
    let chat = Arc::new(MockChat::default());
    let generator = Arc::new(generator);
    let notifier = Arc::new(MockNotifier::default());

    let orchestrator = Orchestrator::new(PipelineParts {
        ledger: Arc::new(ledger.clone()),
        outcomes: flaky.clone(),
        chat: chat.clone(),
        generator: generator.clone(),
        notifier: notifier.clone(),
        context,
        policy: policy(),
        settings: PipelineSettings {
            agent_id: AGENT_ID.to_string(),
            generation_timeout,
        },
    });

    Harness {
        db,
        ledger,
        outcomes,
        flaky,
        chat,
        generator,
        notifier,
        orchestrator,
    }
}
