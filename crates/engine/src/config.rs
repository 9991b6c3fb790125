use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use common::{AlertKind, Error, Result};
use rules::{EffectiveSettings, EmaLengths, RuleFamily, RuleTable};

/// Scanner config file (TOML). Every key is optional.
///
/// Example `config/scanner.toml`:
/// ```toml
/// [symbols]
/// mode = "static"
/// static_list = ["BTCUSDT", "ETHUSDT"]
///
/// [timeframes."5m"]
/// pump_adjust = { delta_pct = 1.5 }
///
/// [timeframes."1h"]
///
/// [rules]
/// cooldown_min = 30
///
/// [rules.breakout_up]
/// buffer_pct = 0.2
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub symbols: SymbolsConfig,
    /// Candle interval (as the exchange names it) to its rule overrides,
    /// scanned in document order.
    pub timeframes: IndexMap<String, TimeframeConfig>,
    pub rules: RulesConfig,
    pub telegram: TelegramConfig,
    pub scanner: ScannerTuning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolMode {
    Static,
    #[default]
    TierAdvisor,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SymbolsConfig {
    pub mode: SymbolMode,
    pub static_list: Vec<String>,
    /// Advisor file with one symbol per line.
    pub tier_file: Option<PathBuf>,
    pub quote_asset: String,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            mode: SymbolMode::TierAdvisor,
            static_list: Vec::new(),
            tier_file: None,
            quote_asset: "USDT".to_string(),
        }
    }
}

/// Per-timeframe overrides, merged over the global `[rules.<family>]` tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeframeConfig {
    pub pump_adjust: RuleTable,
    pub dump_adjust: RuleTable,
    pub bo_up_adjust: RuleTable,
    pub bo_dn_adjust: RuleTable,
    pub cross_adjust: RuleTable,
}

impl TimeframeConfig {
    pub fn adjust(&self, family: RuleFamily) -> &RuleTable {
        match family {
            RuleFamily::PumpSpike => &self.pump_adjust,
            RuleFamily::DumpSpike => &self.dump_adjust,
            RuleFamily::BreakoutUp => &self.bo_up_adjust,
            RuleFamily::BreakdownDown => &self.bo_dn_adjust,
            RuleFamily::EmaCross => &self.cross_adjust,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesConfig {
    pub enable: EnableFlags,
    pub ema_len: usize,
    pub ema_fast_len: usize,
    pub ema_slow_len: usize,
    pub lookback_bars: usize,
    pub cooldown_min: u64,
    pub pump_spike: RuleTable,
    pub dump_spike: RuleTable,
    pub breakout_up: RuleTable,
    pub breakdown_down: RuleTable,
    pub ema_cross: RuleTable,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enable: EnableFlags::default(),
            ema_len: 20,
            ema_fast_len: 9,
            ema_slow_len: 20,
            lookback_bars: 32,
            cooldown_min: 20,
            pump_spike: RuleTable::new(),
            dump_spike: RuleTable::new(),
            breakout_up: RuleTable::new(),
            breakdown_down: RuleTable::new(),
            ema_cross: RuleTable::new(),
        }
    }
}

impl RulesConfig {
    pub fn global(&self, family: RuleFamily) -> &RuleTable {
        match family {
            RuleFamily::PumpSpike => &self.pump_spike,
            RuleFamily::DumpSpike => &self.dump_spike,
            RuleFamily::BreakoutUp => &self.breakout_up,
            RuleFamily::BreakdownDown => &self.breakdown_down,
            RuleFamily::EmaCross => &self.ema_cross,
        }
    }

    pub fn ema_lengths(&self) -> EmaLengths {
        EmaLengths {
            confirm: self.ema_len,
            fast: self.ema_fast_len,
            slow: self.ema_slow_len,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_min.saturating_mul(60))
    }

    /// Bars requested per fetch: the minimum window plus a margin for the
    /// evaluators' own lookback.
    pub fn fetch_limit(&self) -> usize {
        (self.lookback_bars + 50).max(120)
    }

    /// Fewer bars than this and the pair is skipped for the cycle.
    pub fn min_bars(&self) -> usize {
        self.lookback_bars + 5
    }
}

/// `[rules.enable]`: one switch per alert kind, all on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnableFlags {
    pub pump_spike: bool,
    pub dump_spike: bool,
    pub breakout_up: bool,
    pub breakdown_down: bool,
    pub ema_cross_up: bool,
    pub ema_cross_down: bool,
}

impl Default for EnableFlags {
    fn default() -> Self {
        Self {
            pump_spike: true,
            dump_spike: true,
            breakout_up: true,
            breakdown_down: true,
            ema_cross_up: true,
            ema_cross_down: true,
        }
    }
}

impl EnableFlags {
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::Pump => self.pump_spike,
            AlertKind::Dump => self.dump_spike,
            AlertKind::BreakoutUp => self.breakout_up,
            AlertKind::BreakdownDown => self.breakdown_down,
            AlertKind::EmaCrossUp => self.ema_cross_up,
            AlertKind::EmaCrossDown => self.ema_cross_down,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enable: bool,
    pub prefix: String,
    /// Pause after each symbol's rule pass, in milliseconds.
    #[serde(alias = "throttle_sec")]
    pub throttle_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enable: true,
            prefix: "TS".to_string(),
            throttle_ms: 2,
        }
    }
}

impl TelegramConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerTuning {
    /// Pause between cycles.
    pub idle_sec: u64,
    /// Symbols scanned concurrently within one timeframe.
    pub concurrency: usize,
    /// Read once at startup.
    pub fetch_timeout_sec: u64,
    /// Read once at startup.
    pub max_retries: u32,
}

impl Default for ScannerTuning {
    fn default() -> Self {
        Self {
            idle_sec: 5,
            concurrency: 4,
            fetch_timeout_sec: 10,
            max_retries: 2,
        }
    }
}

impl ScannerTuning {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_sec)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_sec)
    }
}

/// One timeframe with its fully merged rule settings.
#[derive(Debug, Clone)]
pub struct TimeframePlan {
    pub interval: String,
    pub settings: EffectiveSettings,
}

/// A validated, immutable view of the config for one scan cycle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub config: ScannerConfig,
    pub timeframes: Vec<TimeframePlan>,
}

impl Snapshot {
    /// Validate `config` and merge every timeframe's settings up front so a
    /// bad value is reported at load time, not mid-scan.
    pub fn build(config: ScannerConfig) -> Result<Self> {
        if config.rules.lookback_bars == 0 {
            return Err(Error::Config("rules.lookback_bars must be at least 1".into()));
        }
        if config.scanner.concurrency == 0 {
            return Err(Error::Config("scanner.concurrency must be at least 1".into()));
        }

        let mut timeframes = Vec::with_capacity(config.timeframes.len());
        for (interval, tf) in &config.timeframes {
            if interval.trim().is_empty() {
                return Err(Error::Config("timeframe names must not be empty".into()));
            }
            let settings = EffectiveSettings::from_tables(|family| {
                family.resolve(Some(config.rules.global(family)), Some(tf.adjust(family)))
            })
            .map_err(|e| Error::Config(format!("timeframes.{interval}: {e}")))?;
            timeframes.push(TimeframePlan { interval: interval.clone(), settings });
        }

        Ok(Self { config, timeframes })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ScannerConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        Self::build(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn interval_names(&self) -> Vec<&str> {
        self.timeframes.iter().map(|t| t.interval.as_str()).collect()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self { config: ScannerConfig::default(), timeframes: Vec::new() }
    }
}

/// Holds the current snapshot and swaps it when the backing file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: Arc<Snapshot>,
}

impl ConfigWatcher {
    /// Load `path` unconditionally. A failed first load leaves the built-in
    /// defaults in place and is logged, not fatal.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut watcher = Self { path, modified: None, current: Arc::new(Snapshot::default()) };
        watcher.modified = watcher.mtime();
        match Snapshot::load(&watcher.path) {
            Ok(snapshot) => {
                info!(target: "cfg", path = %watcher.path.display(), "Configuration loaded");
                watcher.current = Arc::new(snapshot);
            }
            Err(e) => {
                error!(target: "cfg", path = %watcher.path.display(), error = %e, "Configuration load failed, using defaults");
            }
        }
        watcher
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.clone()
    }

    /// Reload if the file's modification time changed since the last check.
    /// Returns `true` when a new snapshot replaced the previous one. A file
    /// that fails to parse keeps the previous snapshot and is not retried
    /// until it changes again.
    pub fn refresh(&mut self) -> bool {
        let Some(mtime) = self.mtime() else {
            return false;
        };
        if self.modified == Some(mtime) {
            return false;
        }
        self.modified = Some(mtime);

        match Snapshot::load(&self.path) {
            Ok(snapshot) => {
                info!(target: "cfg", path = %self.path.display(), timeframes = ?snapshot.interval_names(), "Configuration reloaded");
                self.current = Arc::new(snapshot);
                true
            }
            Err(e) => {
                error!(target: "cfg", path = %self.path.display(), error = %e, "Configuration reload failed, keeping previous");
                false
            }
        }
    }

    fn mtime(&self) -> Option<SystemTime> {
        match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(target: "cfg", path = %self.path.display(), error = %e, "Cannot stat configuration file");
                None
            }
        }
    }
}
