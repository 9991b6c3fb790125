use std::path::PathBuf;

/// Process-level settings loaded from environment variables at startup.
///
/// Scanner tuning lives in the TOML file pointed to by `scanner_config_path`
/// and is hot-reloaded; these values are read once.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,

    // Exchange
    pub binance_rest_url: String,

    // Scanner config file path
    pub scanner_config_path: PathBuf,
}

impl Config {
    pub const DEFAULT_REST_URL: &'static str = "https://api.binance.com";
    pub const DEFAULT_CONFIG_PATH: &'static str = "config/scanner.toml";

    /// Load configuration from environment variables, reading `.env` if present.
    /// Every variable is optional; a malformed chat id is treated as missing.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_id = optional_env("TELEGRAM_CHAT_ID").and_then(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| {
                    tracing::warn!(target: "boot", value = %raw, "TELEGRAM_CHAT_ID is not numeric");
                })
                .ok()
        });

        Config {
            telegram_token: optional_env("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()),
            telegram_chat_id,
            binance_rest_url: optional_env("BINANCE_REST_URL")
                .unwrap_or_else(|| Self::DEFAULT_REST_URL.to_string()),
            scanner_config_path: optional_env("TRADESEEKER_CONFIG")
                .unwrap_or_else(|| Self::DEFAULT_CONFIG_PATH.to_string())
                .into(),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
