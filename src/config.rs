/// Fallback leverage for symbols with no known leverage
pub const DEFAULT_LEVERAGE: f64 = 1.0;

/// Runtime configuration for an account state session
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub account_id: String,              // Key under which metadata is persisted
    pub database_url: String,            // SQLite database for metadata snapshots
    pub default_leverage: f64,           // Used when a symbol's leverage is unknown
    pub persist_interval_seconds: u64,   // Poll interval of the metadata persister
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            account_id: "default".to_string(),
            database_url: "sqlite://data/account_state.db".to_string(),
            default_leverage: DEFAULT_LEVERAGE,
            persist_interval_seconds: 5,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> StoreConfig {
        let mut config = StoreConfig::default();

        if let Ok(account_id) = std::env::var("ACCOUNT_ID") {
            if account_id.trim().is_empty() {
                tracing::warn!(
                    "ACCOUNT_ID is empty, using default: {}",
                    config.account_id
                );
            } else {
                config.account_id = account_id.trim().to_string();
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database_url = url;
            }
        }

        if let Ok(leverage) = std::env::var("DEFAULT_LEVERAGE") {
            match leverage.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 1.0 => {
                    config.default_leverage = value;
                }
                Ok(value) => {
                    tracing::warn!(
                        "Invalid DEFAULT_LEVERAGE value: {} (must be >= 1.0), using default: {}",
                        value,
                        config.default_leverage
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse DEFAULT_LEVERAGE '{}': {}, using default: {}",
                        leverage,
                        e,
                        config.default_leverage
                    );
                }
            }
        }

        if let Ok(interval) = std::env::var("PERSIST_INTERVAL_SECONDS") {
            match interval.parse::<u64>() {
                Ok(value) if (1..=3600).contains(&value) => {
                    config.persist_interval_seconds = value;
                }
                _ => {
                    tracing::warn!(
                        "Invalid PERSIST_INTERVAL_SECONDS '{}' (must be 1..=3600), using default: {}",
                        interval,
                        config.persist_interval_seconds
                    );
                }
            }
        }

        config
    }

    pub fn persist_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.persist_interval_seconds)
    }
}
