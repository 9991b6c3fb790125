/// Exponential moving average series over `values` (oldest first).
///
/// The output has the same length as the input. It is seeded with the first
/// value rather than an SMA, so every position carries an estimate.
/// Empty input or `length <= 1` is passed through unchanged.
pub fn ema(values: &[f64], length: usize) -> Vec<f64> {
    if values.is_empty() || length <= 1 {
        return values.to_vec();
    }
    let k = 2.0 / (length as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &value in &values[1..] {
        prev += k * (value - prev);
        out.push(prev);
    }
    out
}

/// Last value of [`ema`], or `None` for empty input.
pub fn ema_last(values: &[f64], length: usize) -> Option<f64> {
    ema(values, length).last().copied()
}
