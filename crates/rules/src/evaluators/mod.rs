//! The five detectors. Each is a pure function of a bar window and its
//! effective settings.

pub mod breakout;
pub mod cross;
pub mod spike;

pub use breakout::{breakdown_down, breakout_up};
pub use cross::{ema_cross, CrossDirection};
pub use spike::{body_pct, dump, pump};

use common::{AlertKind, Bar, Verdict};

use crate::settings::EffectiveSettings;

/// EMA lengths shared by all timeframes, from `[rules]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaLengths {
    /// Confirmation EMA for breakouts and breakdowns.
    pub confirm: usize,
    pub fast: usize,
    pub slow: usize,
}

impl Default for EmaLengths {
    fn default() -> Self {
        Self { confirm: 20, fast: 9, slow: 20 }
    }
}

/// Run the detector behind `kind` on `bars`. `vol_median` is the trailing
/// volume median the spike rules share with the scanner.
pub fn evaluate(
    kind: AlertKind,
    bars: &[Bar],
    vol_median: f64,
    settings: &EffectiveSettings,
    lengths: &EmaLengths,
) -> Verdict {
    let Some(latest) = bars.last() else {
        return Verdict::quiet();
    };
    match kind {
        AlertKind::Pump => pump(latest, &settings.pump, vol_median),
        AlertKind::Dump => dump(latest, &settings.dump, vol_median),
        AlertKind::BreakoutUp => breakout_up(bars, &settings.breakout_up, lengths.confirm),
        AlertKind::BreakdownDown => breakdown_down(bars, &settings.breakdown_down, lengths.confirm),
        AlertKind::EmaCrossUp => {
            ema_cross(bars, lengths.fast, lengths.slow, CrossDirection::Up, &settings.cross)
        }
        AlertKind::EmaCrossDown => {
            ema_cross(bars, lengths.fast, lengths.slow, CrossDirection::Down, &settings.cross)
        }
    }
}

/// Notional floor a fired `kind` has to clear before it is alerted.
pub fn min_notional(kind: AlertKind, settings: &EffectiveSettings) -> f64 {
    match kind {
        AlertKind::Pump => settings.pump.min_notional,
        AlertKind::Dump => settings.dump.min_notional,
        AlertKind::BreakoutUp => settings.breakout_up.min_notional,
        AlertKind::BreakdownDown => settings.breakdown_down.min_notional,
        AlertKind::EmaCrossUp | AlertKind::EmaCrossDown => settings.cross.min_notional,
    }
}
