use common::{Bar, Verdict};

use crate::indicators::{ema_last, round_to, volume_median, volume_ok};
use crate::settings::BreakoutSettings;

/// The `lookback` bars immediately before the latest one, clamped to what is
/// available.
fn prior_window(bars: &[Bar], lookback: usize) -> &[Bar] {
    let end = bars.len().saturating_sub(1);
    let start = end.saturating_sub(lookback);
    &bars[start..end]
}

/// Fires when the latest close clears the prior range high plus a buffer,
/// optionally above its EMA, on elevated volume.
pub fn breakout_up(bars: &[Bar], settings: &BreakoutSettings, ema_len: usize) -> Verdict {
    let Some(latest) = bars.last() else {
        return Verdict::quiet();
    };
    let window = prior_window(bars, settings.range_lookback);
    if window.is_empty() {
        return Verdict::quiet();
    }

    let range_hi = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let level = range_hi * (1.0 + settings.buffer_pct / 100.0);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema = ema_last(&closes, ema_len).unwrap_or(latest.close);

    let mut cond = latest.close > level;
    if settings.ema_confirm {
        cond = cond && latest.close > ema;
    }
    let fired = cond && volume_ok(latest.volume, settings.vol_mult, volume_median(bars));

    Verdict::new(fired)
        .with("range_hi", round_to(range_hi, 4))
        .with("ema", round_to(ema, 4))
}

/// Mirror of [`breakout_up`]: latest close below the prior range low minus
/// a buffer, optionally below its EMA, on elevated volume.
pub fn breakdown_down(bars: &[Bar], settings: &BreakoutSettings, ema_len: usize) -> Verdict {
    let Some(latest) = bars.last() else {
        return Verdict::quiet();
    };
    let window = prior_window(bars, settings.range_lookback);
    if window.is_empty() {
        return Verdict::quiet();
    }

    let range_lo = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let level = range_lo * (1.0 - settings.buffer_pct / 100.0);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema = ema_last(&closes, ema_len).unwrap_or(latest.close);

    let mut cond = latest.close < level;
    if settings.ema_confirm {
        cond = cond && latest.close < ema;
    }
    let fired = cond && volume_ok(latest.volume, settings.vol_mult, volume_median(bars));

    Verdict::new(fired)
        .with("range_lo", round_to(range_lo, 4))
        .with("ema", round_to(ema, 4))
}
