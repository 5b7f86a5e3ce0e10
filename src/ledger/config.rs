#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub reservation_ttl_ms: u64,
    pub sweep_interval_ms: u64,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("RESPONDER_RESERVATION_TTL_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.reservation_ttl_ms = parsed.max(1_000);
        }
        if let Ok(value) = std::env::var("RESPONDER_RESERVATION_SWEEP_MS")
            && let Ok(parsed) = value.parse::<u64>()
        {
            config.sweep_interval_ms = parsed.max(1_000);
        }

        config
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            reservation_ttl_ms: 180_000,
            sweep_interval_ms: 60_000,
        }
    }
}
