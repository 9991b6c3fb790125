use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One candlestick: open, high, low, close, volume.
///
/// Bar sequences are chronological, oldest first. The last element is the
/// most recently closed candle and is the one the rules evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { open, high, low, close, volume }
    }
}

/// The six alert types, in the order the scanner evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    Pump,
    Dump,
    BreakoutUp,
    BreakdownDown,
    EmaCrossUp,
    EmaCrossDown,
}

impl AlertKind {
    pub const ALL: [AlertKind; 6] = [
        AlertKind::Pump,
        AlertKind::Dump,
        AlertKind::BreakoutUp,
        AlertKind::BreakdownDown,
        AlertKind::EmaCrossUp,
        AlertKind::EmaCrossDown,
    ];

    /// Name shown in the alert line.
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Pump => "PUMP",
            AlertKind::Dump => "DUMP",
            AlertKind::BreakoutUp => "BREAKOUT_UP",
            AlertKind::BreakdownDown => "BREAKDOWN_DN",
            AlertKind::EmaCrossUp => "EMA_CROSS_UP",
            AlertKind::EmaCrossDown => "EMA_CROSS_DN",
        }
    }

    /// Key under `[rules.enable]` that switches this alert on or off.
    pub fn enable_key(self) -> &'static str {
        match self {
            AlertKind::Pump => "pump_spike",
            AlertKind::Dump => "dump_spike",
            AlertKind::BreakoutUp => "breakout_up",
            AlertKind::BreakdownDown => "breakdown_down",
            AlertKind::EmaCrossUp => "ema_cross_up",
            AlertKind::EmaCrossDown => "ema_cross_down",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Diagnostic values attached to a verdict, kept in insertion order.
pub type Diagnostics = Map<String, Value>;

/// Outcome of one rule evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub fired: bool,
    pub diagnostics: Diagnostics,
}

impl Verdict {
    pub fn new(fired: bool) -> Self {
        Self { fired, diagnostics: Map::new() }
    }

    /// A non-firing verdict with no diagnostics.
    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        self.diagnostics.insert(key.to_string(), value);
        self
    }

    pub fn diagnostic(&self, key: &str) -> Option<f64> {
        self.diagnostics.get(key).and_then(Value::as_f64)
    }
}

/// A fired rule, ready to be rendered and delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub symbol: String,
    pub timeframe: String,
    pub price: f64,
    pub diagnostics: Diagnostics,
}

impl Alert {
    /// Render as `[<prefix>] <RULE> | <SYMBOL> <TF> @ <price> | <json>`.
    pub fn message(&self, prefix: &str) -> String {
        let extras = serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "{}".into());
        format!(
            "[{prefix}] {} | {} {} @ {} | {extras}",
            self.kind.label(),
            self.symbol,
            self.timeframe,
            format_significant(self.price, 6),
        )
    }
}

/// Format `value` with `digits` significant figures the way C's `%g` does:
/// fixed notation for moderate exponents, scientific otherwise, trailing
/// zeros removed.
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let digits = digits.max(1);

    // Round once in scientific form so the exponent reflects any carry.
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(&mantissa), exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}"))
    }
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
