use std::time::Duration;

/// Per-request ceiling for the notification and user-context side channels.
pub const SIDE_CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub api_key: String,
    pub agent_id: String,
    pub queue_id: String,
    pub request_timeout: Duration,
}

impl PlatformConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("DIXA_BASE_URL") {
            config.base_url = value;
        }
        if let Ok(value) = std::env::var("DIXA_API_KEY") {
            config.api_key = value;
        }
        if let Ok(value) = std::env::var("AGENT_ID") {
            config.agent_id = value;
        }
        if let Ok(value) = std::env::var("QUEUE_ID") {
            config.queue_id = value;
        }

        config
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev.dixa.io/v1".to_string(),
            api_key: String::new(),
            agent_id: String::new(),
            queue_id: String::new(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub prompt_id: String,
    /// Hard ceiling for one generation, polling included.
    pub timeout: Duration,
    /// First delay between status polls; doubles up to `max_poll_interval`.
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("GENERATOR_BASE_URL") {
            config.base_url = value;
        }
        if let Ok(value) = std::env::var("GENERATOR_API_KEY") {
            config.api_key = value;
        }
        if let Ok(value) = std::env::var("GENERATOR_PROMPT_ID") {
            config.prompt_id = value;
        }
        if let Ok(value) = std::env::var("RESPONDER_GENERATION_TIMEOUT_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.timeout = Duration::from_millis(parsed.max(1_000));
        }
        if let Ok(value) = std::env::var("RESPONDER_GENERATION_POLL_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.poll_interval = Duration::from_millis(parsed.max(50));
        }

        config
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8100".to_string(),
            api_key: String::new(),
            prompt_id: String::new(),
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub api_url: String,
    pub bot_token: String,
    pub channel_id: String,
}

impl SlackConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("SLACK_API_URL") {
            config.api_url = value;
        }
        if let Ok(value) = std::env::var("SLACK_BOT_TOKEN") {
            config.bot_token = value;
        }
        if let Ok(value) = std::env::var("SLACK_CHANNEL_ID") {
            config.channel_id = value;
        }

        config
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api".to_string(),
            bot_token: String::new(),
            channel_id: String::new(),
        }
    }
}

/// User-context source. Only enabled when both values are present.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub api_url: String,
    pub api_token: String,
    pub orders_limit: u32,
    pub threads_limit: u32,
}

impl DashboardConfig {
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("DASHBOARD_API_URL").ok().filter(|v| !v.trim().is_empty())?;
        let api_token = std::env::var("DASHBOARD_API_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty())?;

        Some(Self {
            api_url,
            api_token,
            orders_limit: 10,
            threads_limit: 10,
        })
    }
}
