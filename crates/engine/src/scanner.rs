use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{stream, FutureExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use common::{Alert, AlertKind, AlertSink, MarketData, Result};
use rules::indicators::{notional, volume_median};

use crate::config::{Snapshot, TelegramConfig, TimeframePlan};
use crate::cooldown::CooldownTracker;

/// Totals for one pass over every timeframe and symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pairs_scanned: usize,
    pub pairs_skipped: usize,
    pub pairs_failed: usize,
    pub alerts: usize,
}

enum PairOutcome {
    Scanned { alerts: usize },
    /// Not enough history for this cycle.
    Skipped,
    Failed,
}

/// Runs the detectors over every (timeframe, symbol) pair and delivers the
/// alerts that pass the cooldown and notional gates.
pub struct Scanner {
    market: Arc<dyn MarketData>,
    sink: Arc<dyn AlertSink>,
    cooldowns: Arc<Mutex<CooldownTracker>>,
}

impl Scanner {
    pub fn new(market: Arc<dyn MarketData>, sink: Arc<dyn AlertSink>) -> Self {
        Self::with_cooldowns(market, sink, Arc::new(Mutex::new(CooldownTracker::new())))
    }

    pub fn with_cooldowns(
        market: Arc<dyn MarketData>,
        sink: Arc<dyn AlertSink>,
        cooldowns: Arc<Mutex<CooldownTracker>>,
    ) -> Self {
        Self { market, sink, cooldowns }
    }

    pub fn market(&self) -> &dyn MarketData {
        self.market.as_ref()
    }

    pub fn cooldowns(&self) -> Arc<Mutex<CooldownTracker>> {
        self.cooldowns.clone()
    }

    /// Scan every timeframe in order. Within a timeframe up to
    /// `scanner.concurrency` symbols are in flight at once; a symbol is
    /// never scanned twice concurrently, which keeps each cooldown
    /// check-and-mark exclusive to one task.
    pub async fn run_cycle(&self, snapshot: &Snapshot, symbols: &[String]) -> CycleReport {
        let mut report = CycleReport::default();
        let concurrency = snapshot.config.scanner.concurrency.max(1);

        for plan in &snapshot.timeframes {
            // Futures are built up front so the stream holds no closure over
            // borrowed items, which keeps the cycle spawnable.
            let scans: Vec<_> = symbols
                .iter()
                .map(|symbol| self.scan_guarded(snapshot, plan, symbol))
                .collect();
            let outcomes: Vec<PairOutcome> = stream::iter(scans)
                .buffer_unordered(concurrency)
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    PairOutcome::Scanned { alerts } => {
                        report.pairs_scanned += 1;
                        report.alerts += alerts;
                    }
                    PairOutcome::Skipped => report.pairs_skipped += 1,
                    PairOutcome::Failed => report.pairs_failed += 1,
                }
            }
        }
        report
    }

    /// Contain both errors and panics to the pair that raised them.
    async fn scan_guarded(&self, snapshot: &Snapshot, plan: &TimeframePlan, symbol: &str) -> PairOutcome {
        let timeframe = plan.interval.as_str();
        match AssertUnwindSafe(self.scan_pair(snapshot, plan, symbol)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(symbol, timeframe, error = %e, "Scan failed, skipping pair");
                PairOutcome::Failed
            }
            Err(panic) => {
                error!(symbol, timeframe, panic = %panic_message(&*panic), "Scan panicked, skipping pair");
                PairOutcome::Failed
            }
        }
    }

    async fn scan_pair(&self, snapshot: &Snapshot, plan: &TimeframePlan, symbol: &str) -> Result<PairOutcome> {
        let rules_cfg = &snapshot.config.rules;
        let timeframe = plan.interval.as_str();

        let bars = self.market.klines(symbol, timeframe, rules_cfg.fetch_limit()).await?;
        if bars.len() < rules_cfg.min_bars() {
            debug!(symbol, timeframe, bars = bars.len(), needed = rules_cfg.min_bars(), "Insufficient history");
            return Ok(PairOutcome::Skipped);
        }

        let latest = bars[bars.len() - 1];
        let vol_median = volume_median(&bars);
        let bar_notional = notional(&latest);
        let lengths = rules_cfg.ema_lengths();
        let window = rules_cfg.cooldown();

        let mut alerts = 0;
        for kind in AlertKind::ALL {
            if !rules_cfg.enable.is_enabled(kind) {
                continue;
            }
            if self.cooldowns.lock().await.is_on_cooldown(symbol, kind, window) {
                continue;
            }

            let verdict = rules::evaluate(kind, &bars, vol_median, &plan.settings, &lengths);
            if !verdict.fired || bar_notional < rules::min_notional(kind, &plan.settings) {
                continue;
            }

            let alert = Alert {
                kind,
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                price: latest.close,
                diagnostics: verdict.diagnostics,
            };
            self.dispatch(&snapshot.config.telegram, &alert).await;
            self.cooldowns.lock().await.mark_fired(symbol, kind);
            alerts += 1;
        }

        let throttle = snapshot.config.telegram.throttle();
        if !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }
        Ok(PairOutcome::Scanned { alerts })
    }

    async fn dispatch(&self, telegram: &TelegramConfig, alert: &Alert) {
        let message = alert.message(&telegram.prefix);
        info!(
            target: "rule",
            rule = alert.kind.label(),
            symbol = %alert.symbol,
            timeframe = %alert.timeframe,
            price = alert.price,
            "{message}"
        );
        if telegram.enable {
            self.sink.deliver(&message).await;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
