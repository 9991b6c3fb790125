use common::{Bar, Verdict};

use crate::indicators::{ema, round_to, volume_median, volume_ok};
use crate::settings::CrossSettings;

/// Which way the fast EMA has to cross the slow one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Up,
    Down,
}

/// Fires when the fast EMA crossed the slow EMA in `direction` between the
/// previous bar and the latest one, on elevated volume.
pub fn ema_cross(
    bars: &[Bar],
    fast_len: usize,
    slow_len: usize,
    direction: CrossDirection,
    settings: &CrossSettings,
) -> Verdict {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema(&closes, fast_len);
    let slow = ema(&closes, slow_len);
    if fast.len() < 2 || slow.len() < 2 {
        return Verdict::quiet();
    }

    let (f_prev, f_now) = (fast[fast.len() - 2], fast[fast.len() - 1]);
    let (s_prev, s_now) = (slow[slow.len() - 2], slow[slow.len() - 1]);
    let crossed = match direction {
        CrossDirection::Up => f_prev <= s_prev && f_now > s_now,
        CrossDirection::Down => f_prev >= s_prev && f_now < s_now,
    };

    let latest_volume = bars.last().map(|b| b.volume).unwrap_or(0.0);
    let fired = crossed && volume_ok(latest_volume, settings.vol_mult, volume_median(bars));

    Verdict::new(fired)
        .with("ema_fast", round_to(f_now, 4))
        .with("ema_slow", round_to(s_now, 4))
}
