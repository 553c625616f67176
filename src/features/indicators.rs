//! Trailing-window kernels over a single ticker's series.
//!
//! Every output has the input's length. Positions without a full window of
//! defined inputs are `NaN`, and no output at `t` reads input beyond `t`.

/// Substituted for a zero average loss in the RSI ratio.
pub const RSI_EPSILON: f64 = 1e-9;

/// Fractional change over `k` periods: `p[t] / p[t-k] - 1`.
pub fn pct_change(prices: &[f64], k: usize) -> Vec<f64> {
    (0..prices.len())
        .map(|t| {
            if k == 0 || t < k {
                f64::NAN
            } else {
                prices[t] / prices[t - k] - 1.0
            }
        })
        .collect()
}

fn trailing_window(values: &[f64], t: usize, window: usize) -> Option<&[f64]> {
    if window == 0 || t + 1 < window {
        return None;
    }
    let slice = &values[t + 1 - window..=t];
    slice.iter().all(|v| v.is_finite()).then_some(slice)
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| match trailing_window(values, t, window) {
            Some(w) => w.iter().sum::<f64>() / window as f64,
            None => f64::NAN,
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator) over a trailing window.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|t| match trailing_window(values, t, window) {
            Some(w) if window > 1 => {
                let mean = w.iter().sum::<f64>() / window as f64;
                let ss: f64 = w.iter().map(|v| (v - mean).powi(2)).sum();
                (ss / (window - 1) as f64).sqrt()
            }
            _ => f64::NAN,
        })
        .collect()
}

/// Relative strength index from simple trailing means of gains and losses.
pub fn rsi(prices: &[f64], window: usize) -> Vec<f64> {
    let delta: Vec<f64> = (0..prices.len())
        .map(|t| if t == 0 { f64::NAN } else { prices[t] - prices[t - 1] })
        .collect();
    // f64::max/min would turn the leading NaN into 0.
    let gains: Vec<f64> = delta
        .iter()
        .map(|d| if d.is_nan() { f64::NAN } else { d.max(0.0) })
        .collect();
    let losses: Vec<f64> = delta
        .iter()
        .map(|d| if d.is_nan() { f64::NAN } else { -d.min(0.0) })
        .collect();

    let avg_gain = rolling_mean(&gains, window);
    let avg_loss = rolling_mean(&losses, window);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| {
            let loss = if loss == 0.0 { RSI_EPSILON } else { loss };
            let rs = gain / loss;
            100.0 - 100.0 / (1.0 + rs)
        })
        .collect()
}
