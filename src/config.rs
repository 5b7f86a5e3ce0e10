use std::time::Duration;

use crate::{
    clients::{DashboardConfig, GeneratorConfig, PlatformConfig, SIDE_CHANNEL_TIMEOUT, SlackConfig},
    ledger::LedgerConfig,
    telemetry::LogFormat,
    validation::ValidationPolicy,
};

/// Everything the binary reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub audit_api_token: Option<String>,
    pub log_format: LogFormat,
    pub ledger: LedgerConfig,
    pub policy: ValidationPolicy,
    pub platform: PlatformConfig,
    pub generator: GeneratorConfig,
    pub slack: SlackConfig,
    pub dashboard: Option<DashboardConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            ledger: LedgerConfig::from_env(),
            policy: ValidationPolicy::from_env(),
            platform: PlatformConfig::from_env(),
            generator: GeneratorConfig::from_env(),
            slack: SlackConfig::from_env(),
            dashboard: DashboardConfig::from_env(),
            ..Self::default()
        };

        if let Ok(value) = std::env::var("DATABASE_URL") {
            config.database_url = value;
        }
        if let Ok(value) = std::env::var("RESPONDER_BIND_ADDR") {
            config.bind_addr = value;
        }
        config.audit_api_token = std::env::var("RESPONDER_AUDIT_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        if let Ok(value) = std::env::var("RESPONDER_LOG_FORMAT")
            && let Some(format) = LogFormat::parse(&value)
        {
            config.log_format = format;
        }

        config
    }

    /// Longest one processing attempt can run: claim and delivery against the
    /// platform, context lookup and notification on the side channels, one
    /// generation, plus slack for the database writes.
    pub fn attempt_budget(&self) -> Duration {
        self.generator.timeout
            + self.platform.request_timeout * 2
            + SIDE_CHANNEL_TIMEOUT * 2
            + ATTEMPT_MARGIN
    }

    /// Raises the reservation TTL so a slow attempt cannot outlive its token.
    /// Returns the configured value when it had to be raised.
    pub fn fit_reservation_ttl(&mut self) -> Option<u64> {
        let floor = u64::try_from(self.attempt_budget().as_millis()).unwrap_or(u64::MAX);
        let configured = self.ledger.reservation_ttl_ms;
        if configured >= floor {
            return None;
        }
        self.ledger.reservation_ttl_ms = floor;
        Some(configured)
    }
}

const ATTEMPT_MARGIN: Duration = Duration::from_secs(15);

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:responder.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:8000".to_string(),
            audit_api_token: None,
            log_format: LogFormat::default(),
            ledger: LedgerConfig::default(),
            policy: ValidationPolicy::default(),
            platform: PlatformConfig::default(),
            generator: GeneratorConfig::default(),
            slack: SlackConfig::default(),
            dashboard: None,
        }
    }
}
