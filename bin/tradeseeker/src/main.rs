use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{AlertSink, Config, MarketData, NullSink};
use engine::{BinanceRest, ConfigWatcher, Scanner, Scheduler};
use telegram_notify::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let watcher = ConfigWatcher::open(&cfg.scanner_config_path);
    let snapshot = watcher.current();
    info!(
        target: "boot",
        config = %watcher.path().display(),
        timeframes = ?snapshot.interval_names(),
        "Trade Seeker starting"
    );

    // ── Exchange client ───────────────────────────────────────────────────────
    // Timeout and retry count are fixed for the life of the process.
    let tuning = &snapshot.config.scanner;
    let market: Arc<dyn MarketData> = Arc::new(
        BinanceRest::new(&cfg.binance_rest_url, tuning.fetch_timeout(), tuning.max_retries)
            .context("building Binance REST client")?,
    );

    // ── Alert delivery ────────────────────────────────────────────────────────
    let sink: Arc<dyn AlertSink> = match TelegramNotifier::from_config(&cfg) {
        Some(notifier) => Arc::new(notifier),
        None => {
            warn!(target: "boot", "TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing, alerts will only be logged");
            Arc::new(NullSink)
        }
    };

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let scanner = Arc::new(Scanner::new(market, sink));
    let scheduler = Scheduler::start(watcher, scanner).await;

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Shutdown complete");
    Ok(())
}
