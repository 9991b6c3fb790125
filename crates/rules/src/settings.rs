use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::Value;

/// Named parameters for one rule family, as written in the config file.
pub type RuleTable = toml::Table;

/// Overlay `overrides` on `defaults`: every key in `overrides` wins, every
/// other key keeps its default. Total and independent per key.
pub fn merge(defaults: &RuleTable, overrides: &RuleTable) -> RuleTable {
    let mut out = defaults.clone();
    for (key, value) in overrides {
        out.insert(key.clone(), value.clone());
    }
    out
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid {family} settings: {source}")]
    Invalid {
        family: &'static str,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {family} settings: {reason}")]
    OutOfRange { family: &'static str, reason: String },
}

/// The five rule families. The EMA cross family backs two alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamily {
    PumpSpike,
    DumpSpike,
    BreakoutUp,
    BreakdownDown,
    EmaCross,
}

impl RuleFamily {
    pub const ALL: [RuleFamily; 5] = [
        RuleFamily::PumpSpike,
        RuleFamily::DumpSpike,
        RuleFamily::BreakoutUp,
        RuleFamily::BreakdownDown,
        RuleFamily::EmaCross,
    ];

    /// Table name under `[rules]`.
    pub fn config_key(self) -> &'static str {
        match self {
            RuleFamily::PumpSpike => "pump_spike",
            RuleFamily::DumpSpike => "dump_spike",
            RuleFamily::BreakoutUp => "breakout_up",
            RuleFamily::BreakdownDown => "breakdown_down",
            RuleFamily::EmaCross => "ema_cross",
        }
    }

    /// Per-timeframe override key under `[timeframes.<tf>]`.
    pub fn adjust_key(self) -> &'static str {
        match self {
            RuleFamily::PumpSpike => "pump_adjust",
            RuleFamily::DumpSpike => "dump_adjust",
            RuleFamily::BreakoutUp => "bo_up_adjust",
            RuleFamily::BreakdownDown => "bo_dn_adjust",
            RuleFamily::EmaCross => "cross_adjust",
        }
    }

    /// Built-in values used for any key neither the global table nor the
    /// timeframe override sets.
    pub fn builtin_defaults(self) -> RuleTable {
        match self {
            RuleFamily::PumpSpike => table([
                ("delta_pct", Value::Float(3.0)),
                ("vol_mult", Value::Float(2.0)),
                ("min_notional", Value::Float(0.0)),
            ]),
            RuleFamily::DumpSpike => table([
                ("delta_pct", Value::Float(-3.0)),
                ("vol_mult", Value::Float(2.0)),
                ("min_notional", Value::Float(0.0)),
            ]),
            RuleFamily::BreakoutUp | RuleFamily::BreakdownDown => table([
                ("range_lookback", Value::Integer(32)),
                ("buffer_pct", Value::Float(0.1)),
                ("vol_mult", Value::Float(1.5)),
                ("ema_confirm", Value::Boolean(true)),
                ("min_notional", Value::Float(0.0)),
            ]),
            RuleFamily::EmaCross => table([
                ("vol_mult", Value::Float(1.0)),
                ("min_notional", Value::Float(0.0)),
            ]),
        }
    }

    /// Built-in defaults, then `global`, then `adjust`.
    pub fn resolve(self, global: Option<&RuleTable>, adjust: Option<&RuleTable>) -> RuleTable {
        let empty = RuleTable::new();
        let base = merge(&self.builtin_defaults(), global.unwrap_or(&empty));
        merge(&base, adjust.unwrap_or(&empty))
    }
}

impl std::fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_key())
    }
}

fn table<const N: usize>(entries: [(&str, Value); N]) -> RuleTable {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Pump and dump spike parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeSettings {
    /// Candle body move in percent; negative for dumps.
    pub delta_pct: f64,
    pub vol_mult: f64,
    pub min_notional: f64,
}

/// Breakout and breakdown parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSettings {
    /// Number of bars before the latest that form the range.
    pub range_lookback: usize,
    pub buffer_pct: f64,
    pub vol_mult: f64,
    #[serde(default = "default_true")]
    pub ema_confirm: bool,
    pub min_notional: f64,
}

/// EMA cross parameters. EMA lengths come from `[rules]`, not from here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSettings {
    pub vol_mult: f64,
    pub min_notional: f64,
}

fn default_true() -> bool {
    true
}

/// Fully merged, typed settings for every family on one timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub pump: SpikeSettings,
    pub dump: SpikeSettings,
    pub breakout_up: BreakoutSettings,
    pub breakdown_down: BreakoutSettings,
    pub cross: CrossSettings,
}

impl EffectiveSettings {
    /// Build from a function returning the merged table for each family.
    pub fn from_tables<F>(mut table_for: F) -> Result<Self, SettingsError>
    where
        F: FnMut(RuleFamily) -> RuleTable,
    {
        let pump: SpikeSettings = typed(RuleFamily::PumpSpike, &mut table_for)?;
        let dump: SpikeSettings = typed(RuleFamily::DumpSpike, &mut table_for)?;
        let breakout_up: BreakoutSettings = typed(RuleFamily::BreakoutUp, &mut table_for)?;
        let breakdown_down: BreakoutSettings = typed(RuleFamily::BreakdownDown, &mut table_for)?;
        let cross: CrossSettings = typed(RuleFamily::EmaCross, &mut table_for)?;

        for (family, s) in [(RuleFamily::PumpSpike, &pump), (RuleFamily::DumpSpike, &dump)] {
            check_finite(family, "delta_pct", s.delta_pct)?;
            check_multiplier(family, s.vol_mult)?;
            check_finite(family, "min_notional", s.min_notional)?;
        }
        for (family, s) in [
            (RuleFamily::BreakoutUp, &breakout_up),
            (RuleFamily::BreakdownDown, &breakdown_down),
        ] {
            if s.range_lookback == 0 {
                return Err(SettingsError::OutOfRange {
                    family: family.config_key(),
                    reason: "range_lookback must be at least 1".into(),
                });
            }
            check_finite(family, "buffer_pct", s.buffer_pct)?;
            check_multiplier(family, s.vol_mult)?;
            check_finite(family, "min_notional", s.min_notional)?;
        }
        check_multiplier(RuleFamily::EmaCross, cross.vol_mult)?;
        check_finite(RuleFamily::EmaCross, "min_notional", cross.min_notional)?;

        Ok(Self { pump, dump, breakout_up, breakdown_down, cross })
    }

    /// Settings built purely from the built-in defaults.
    pub fn builtin() -> Self {
        Self::from_tables(RuleFamily::builtin_defaults)
            .unwrap_or_else(|e| unreachable!("built-in rule settings are valid: {e}"))
    }
}

fn typed<T, F>(family: RuleFamily, table_for: &mut F) -> Result<T, SettingsError>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(RuleFamily) -> RuleTable,
{
    Value::Table(table_for(family))
        .try_into()
        .map_err(|source| SettingsError::Invalid { family: family.config_key(), source })
}

fn check_finite(family: RuleFamily, key: &str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            family: family.config_key(),
            reason: format!("{key} must be finite"),
        })
    }
}

fn check_multiplier(family: RuleFamily, vol_mult: f64) -> Result<(), SettingsError> {
    if vol_mult.is_finite() && vol_mult >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            family: family.config_key(),
            reason: "vol_mult must be a non-negative number".into(),
        })
    }
}
