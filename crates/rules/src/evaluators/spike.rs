use common::{Bar, Verdict};

use crate::indicators::{round_to, volume_ok};
use crate::settings::SpikeSettings;

/// Body move of a bar in percent of its open. A zero open yields 0.
pub fn body_pct(bar: &Bar) -> f64 {
    if bar.open == 0.0 {
        0.0
    } else {
        (bar.close - bar.open) / bar.open * 100.0
    }
}

/// Fires when the latest bar rose at least `delta_pct` on elevated volume.
pub fn pump(bar: &Bar, settings: &SpikeSettings, vol_median: f64) -> Verdict {
    let pct = body_pct(bar);
    let fired = pct >= settings.delta_pct && volume_ok(bar.volume, settings.vol_mult, vol_median);
    Verdict::new(fired).with("delta_pct", round_to(pct, 3))
}

/// Fires when the latest bar fell to `delta_pct` or below (a negative
/// threshold) on elevated volume.
pub fn dump(bar: &Bar, settings: &SpikeSettings, vol_median: f64) -> Verdict {
    let pct = body_pct(bar);
    let fired = pct <= settings.delta_pct && volume_ok(bar.volume, settings.vol_mult, vol_median);
    Verdict::new(fired).with("delta_pct", round_to(pct, 3))
}
