use std::ops::Range;
use tracing::{info, warn};

use super::indicators::{pct_change, rolling_std, rsi};
use crate::config::FeatureSettings;
use crate::data::Frame;
use crate::error::Result;

/// Applies a kernel to each ticker block independently so that windows
/// restart at every ticker boundary.
fn per_ticker<F>(values: &[f64], blocks: &[Range<usize>], kernel: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let mut out = Vec::with_capacity(values.len());
    for block in blocks {
        out.extend(kernel(&values[block.clone()]));
    }
    out
}

/// Adds lagged returns, rolling volatility and RSI computed from adjusted
/// close, then keeps only rows where every column is defined.
pub fn build_feature_table(panel: &Frame, settings: &FeatureSettings) -> Result<Frame> {
    let dated: Vec<bool> = panel.keys().iter().map(|k| k.date.is_some()).collect();
    let undated = dated.iter().filter(|d| !**d).count();
    if undated > 0 {
        warn!("Dropping {} rows with invalid dates before feature computation", undated);
    }
    let frame = panel.filter(&dated).sorted();

    let price = frame.column("adj_close")?.to_vec();
    let blocks = frame.ticker_blocks();

    let mut out = frame;
    for &k in &settings.return_lags {
        let returns = per_ticker(&price, &blocks, |p| pct_change(p, k));
        out = out.with_column(format!("ret{}", k), returns)?;
    }

    let window = settings.volatility_window;
    let ret1 = out.column("ret1")?.to_vec();
    let volatility = per_ticker(&ret1, &blocks, |r| rolling_std(r, window));
    out = out.with_column(format!("rv{}", window), volatility)?;

    let rsi_window = settings.rsi_window;
    let oscillator = per_ticker(&price, &blocks, |p| rsi(p, rsi_window));
    out = out.with_column(format!("rsi{}", rsi_window), oscillator)?;

    let complete = out.complete_rows();
    let table = out.filter(&complete);
    info!(
        "Feature table: {} of {} rows have full history",
        table.len(),
        out.len()
    );
    Ok(table)
}
