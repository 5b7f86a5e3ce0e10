use std::{net::SocketAddr, str::FromStr, sync::Arc, time::Duration};

use responder::{
    app::router,
    clients::{ChatPlatform, ContextProvider, DashboardClient, DixaClient, HttpGenerator, SlackNotifier},
    config::AppConfig,
    ledger::{SqliteLedger, spawn_sweeper},
    outcomes::SqliteOutcomeLog,
    pipeline::{Orchestrator, PipelineParts, PipelineSettings},
    state::AppState,
    telemetry::init_logging,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env();
    init_logging(config.log_format);

    if let Some(configured) = config.fit_reservation_ttl() {
        tracing::warn!(
            configured_ms = configured,
            reservation_ttl_ms = config.ledger.reservation_ttl_ms,
            "reservation ttl shorter than one processing attempt, raised"
        );
    }

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    if config.platform.agent_id.is_empty() {
        tracing::warn!("AGENT_ID is not set; claims and replies will be rejected by the platform");
    }
    if config.policy.allowed_domains.is_empty()
        && config.policy.domain_patterns.is_empty()
        && config.policy.allowed_emails.is_empty()
    {
        tracing::warn!("no sender allow-list configured; every event will be ignored");
    }

    let ledger = SqliteLedger::new(pool.clone(), &config.ledger);
    let _sweeper = spawn_sweeper(
        ledger.clone(),
        Duration::from_millis(config.ledger.sweep_interval_ms),
    );
    let outcomes = SqliteOutcomeLog::new(pool.clone());
    let chat: Arc<dyn ChatPlatform> = Arc::new(DixaClient::new(&config.platform));
    let context = config.dashboard.as_ref().map(|dashboard| {
        Arc::new(DashboardClient::new(dashboard)) as Arc<dyn ContextProvider>
    });

    let orchestrator = Orchestrator::new(PipelineParts {
        ledger: Arc::new(ledger),
        outcomes: Arc::new(outcomes.clone()),
        chat: chat.clone(),
        generator: Arc::new(HttpGenerator::new(&config.generator)),
        notifier: Arc::new(SlackNotifier::new(&config.slack)),
        context,
        policy: config.policy.clone(),
        settings: PipelineSettings {
            agent_id: config.platform.agent_id.clone(),
            generation_timeout: config.generator.timeout,
        },
    });

    let state = AppState {
        orchestrator,
        outcomes,
        chat,
        audit_api_token: config.audit_api_token.clone(),
    };

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "responder listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}
