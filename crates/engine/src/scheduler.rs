use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::ConfigWatcher;
use crate::scanner::{CycleReport, Scanner};
use crate::universe::{dedup, resolve_universe};

/// Drives the scanner forever: reload config, scan, idle, repeat.
///
/// The symbol universe is resolved once in [`Scheduler::start`] and kept for
/// the life of the process; config edits apply from the next cycle.
pub struct Scheduler {
    watcher: ConfigWatcher,
    scanner: Arc<Scanner>,
    symbols: Arc<Vec<String>>,
}

impl Scheduler {
    /// Resolve the scan universe from the current config and build the scheduler.
    pub async fn start(watcher: ConfigWatcher, scanner: Arc<Scanner>) -> Self {
        let snapshot = watcher.current();
        let symbols = resolve_universe(&snapshot.config.symbols, scanner.market()).await;
        info!(
            target: "boot",
            symbols = symbols.len(),
            timeframes = ?snapshot.interval_names(),
            "Scan universe resolved"
        );
        if snapshot.timeframes.is_empty() {
            warn!(target: "boot", "No timeframes configured, cycles will be empty until the config changes");
        }
        Self::new(watcher, scanner, symbols)
    }

    /// Duplicate symbols are dropped: the scanner relies on each symbol
    /// being scanned by at most one task at a time.
    pub fn new(watcher: ConfigWatcher, scanner: Arc<Scanner>, symbols: Vec<String>) -> Self {
        Self { watcher, scanner, symbols: Arc::new(dedup(symbols)) }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Run until `shutdown` resolves. A cycle in progress is aborted on
    /// shutdown; a cycle that panics is logged and the loop carries on.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Scheduler running");

        loop {
            let (cycle, idle) = self.spawn_cycle();
            let abort = cycle.abort_handle();

            tokio::select! {
                _ = &mut shutdown => {
                    abort.abort();
                    info!("Shutdown requested, stopping scheduler");
                    return;
                }
                joined = cycle => log_cycle(joined),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    return;
                }
                _ = tokio::time::sleep(idle) => {}
            }
        }
    }

    /// Run exactly one cycle (reload check included) and return its report,
    /// or `None` if the cycle task did not complete.
    pub async fn run_once(&mut self) -> Option<CycleReport> {
        let (cycle, _) = self.spawn_cycle();
        let joined = cycle.await;
        let report = joined.as_ref().ok().copied();
        log_cycle(joined);
        report
    }

    /// Refresh the config and start one cycle in its own task. Returns the
    /// task and the idle pause to apply after it.
    fn spawn_cycle(&mut self) -> (JoinHandle<CycleReport>, Duration) {
        self.watcher.refresh();
        let snapshot = self.watcher.current();
        let idle = snapshot.config.scanner.idle();

        let scanner = self.scanner.clone();
        let symbols = self.symbols.clone();
        let cycle = tokio::spawn(async move { scanner.run_cycle(&snapshot, &symbols).await });
        (cycle, idle)
    }
}

fn log_cycle(joined: Result<CycleReport, JoinError>) {
    match joined {
        Ok(report) => info!(
            scanned = report.pairs_scanned,
            skipped = report.pairs_skipped,
            failed = report.pairs_failed,
            alerts = report.alerts,
            "Cycle complete"
        ),
        Err(e) if e.is_panic() => error!(error = %e, "Cycle panicked, continuing"),
        Err(e) => warn!(error = %e, "Cycle task did not complete"),
    }
}
