use common::Bar;

/// Number of trailing bars the volume baseline is taken over.
pub const VOLUME_WINDOW: usize = 20;

/// Median of `values`, or `default` when the input is empty or contains NaN.
pub fn median(values: &[f64], default: f64) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return default;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Median volume over the trailing [`VOLUME_WINDOW`] bars, 0 when undefined.
pub fn volume_median(bars: &[Bar]) -> f64 {
    let start = bars.len().saturating_sub(VOLUME_WINDOW);
    let volumes: Vec<f64> = bars[start..].iter().map(|b| b.volume).collect();
    median(&volumes, 0.0)
}

/// Approximate quote turnover of a bar: volume times typical price.
pub fn notional(bar: &Bar) -> f64 {
    bar.volume * (bar.high + bar.low + bar.close) / 3.0
}

/// True when `volume` clears `vol_mult` times the baseline. A zero baseline
/// counts as 1 so an empty history never yields a zero threshold.
pub fn volume_ok(volume: f64, vol_mult: f64, vol_median: f64) -> bool {
    let baseline = if vol_median == 0.0 { 1.0 } else { vol_median };
    volume >= vol_mult * baseline
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_known_values() {
        assert_eq!(median(&[], 7.0), 7.0);
        assert_eq!(median(&[1.0, 2.0, 3.0], 0.0), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0], 0.0), 2.5);
        assert_eq!(median(&[3.0, 1.0, 2.0], 0.0), 2.0);
    }

    #[test]
    fn median_nan_degrades_to_default() {
        assert_eq!(median(&[1.0, f64::NAN], -1.0), -1.0);
    }

    #[test]
    fn volume_median_uses_trailing_window() {
        let mut bars: Vec<Bar> = (0..30).map(|_| Bar::new(1.0, 1.0, 1.0, 1.0, 1000.0)).collect();
        for bar in bars.iter_mut().skip(10) {
            bar.volume = 5.0;
        }
        assert_eq!(volume_median(&bars), 5.0);
        assert_eq!(volume_median(&[]), 0.0);
    }

    #[test]
    fn notional_uses_typical_price() {
        let bar = Bar::new(9.0, 12.0, 6.0, 9.0, 10.0);
        assert_eq!(notional(&bar), 90.0);
    }

    #[test]
    fn volume_gate_treats_zero_baseline_as_one() {
        assert!(volume_ok(1.5, 1.5, 0.0));
        assert!(!volume_ok(1.4, 1.5, 0.0));
        assert!(volume_ok(300.0, 1.5, 200.0));
        assert!(!volume_ok(299.0, 1.5, 200.0));
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(10.12345, 3), 10.123);
        assert_eq!(round_to(-2.00049, 3), -2.0);
        assert_eq!(round_to(100.43216, 4), 100.4322);
    }
}
