use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::{info, warn};

use super::frame::{Frame, RowKey};
use super::raw::RawTable;
use crate::error::{EvalError, Result};

pub const REQUIRED_FIELDS: [&str; 8] = [
    "ticker", "date", "open", "high", "low", "close", "adj_close", "volume",
];

/// Numeric fields of the canonical panel, in output order.
pub const PRICE_FIELDS: [&str; 6] = ["open", "high", "low", "close", "adj_close", "volume"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Maps Bloomberg export and time-series layout headers onto canonical
/// field names. Unknown headers pass through unchanged.
pub fn canonical_name(header: &str) -> &str {
    match header.trim() {
        "Security" | "Ticker" | "Symbol" => "ticker",
        "Date" => "date",
        "PX_OPEN" | "Open" => "open",
        "PX_HIGH" | "High" => "high",
        "PX_LOW" | "Low" => "low",
        "PX_LAST" | "Close" => "close",
        "PX_ADJ_CLOSE" | "Adj Close" => "adj_close",
        "VOLUME" | "Volume" => "volume",
        other => other,
    }
}

/// Parses a calendar date; anything unrecognised becomes the invalid-date
/// sentinel (`None`).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.date());
    }
    DateTime::parse_from_rfc3339(value).ok().map(|ts| ts.date_naive())
}

fn parse_number(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Normalises a provider export into the canonical panel sorted by
/// (ticker, date).
pub fn build_panel(raw: &RawTable) -> Result<Frame> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (i, header) in raw.headers().iter().enumerate() {
        positions.entry(canonical_name(header)).or_insert(i);
    }

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !positions.contains_key(field))
        .collect();
    if !missing.is_empty() {
        return Err(EvalError::missing(missing));
    }

    let ticker_at = positions["ticker"];
    let date_at = positions["date"];
    let keys: Vec<RowKey> = raw
        .records()
        .iter()
        .map(|r| RowKey::new(r[ticker_at].trim(), parse_date(&r[date_at])))
        .collect();

    let invalid = keys.iter().filter(|k| k.date.is_none()).count();
    if invalid > 0 {
        warn!("{} rows carry an unparseable date", invalid);
    }

    let mut frame = Frame::new(keys);
    for field in PRICE_FIELDS {
        let at = positions[field];
        let mut values: Vec<f64> = raw.records().iter().map(|r| parse_number(&r[at])).collect();
        if field == "volume" {
            let negative = values.iter().filter(|v| **v < 0.0).count();
            if negative > 0 {
                warn!("{} rows carry a negative volume, treated as missing", negative);
                values.iter_mut().filter(|v| **v < 0.0).for_each(|v| *v = f64::NAN);
            }
        }
        frame = frame.with_column(field, values)?;
    }

    let frame = frame.sorted();

    // Collapse repeated (ticker, date) pairs; the stable sort keeps the first one ahead.
    let keys = frame.keys();
    let keep: Vec<bool> = (0..keys.len())
        .map(|i| i == 0 || keys[i].date.is_none() || keys[i] != keys[i - 1])
        .collect();
    let duplicates = keep.iter().filter(|k| !**k).count();
    let frame = if duplicates > 0 {
        warn!("Dropping {} duplicate (ticker, date) rows", duplicates);
        frame.filter(&keep)
    } else {
        frame
    };

    info!(
        "Panel built: {} rows across {} tickers",
        frame.len(),
        frame.ticker_blocks().len()
    );
    Ok(frame)
}
