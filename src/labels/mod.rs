use tracing::info;

use crate::config::LabelSettings;
use crate::data::Frame;
use crate::error::{EvalError, Result};

/// Adjusted close when present, close otherwise.
fn label_price(frame: &Frame) -> Result<&[f64]> {
    if frame.has_column("adj_close") {
        frame.column("adj_close")
    } else if frame.has_column("close") {
        frame.column("close")
    } else {
        Err(EvalError::missing(["adj_close", "close"]))
    }
}

/// Attaches `y_ret_{h}` and `y_up_{h}` and drops the last `h` rows of each
/// ticker, which have no forward observation.
///
/// Forward prices are read inside each ticker block of the key-sorted frame,
/// and the labels are appended to that same frame, so every label stays
/// attached to the (ticker, date) it was computed for.
pub fn attach_labels(features: &Frame, settings: &LabelSettings) -> Result<Frame> {
    let horizon = settings.horizon;
    let frame = features.sorted();
    let price = label_price(&frame)?;

    let mut forward = vec![f64::NAN; frame.len()];
    for block in frame.ticker_blocks() {
        for t in block.clone() {
            if t + horizon < block.end {
                forward[t] = price[t + horizon] / price[t] - 1.0;
            }
        }
    }
    let direction: Vec<f64> = forward
        .iter()
        .map(|r| if *r > 0.0 { 1.0 } else { 0.0 })
        .collect();
    let labelled: Vec<bool> = forward.iter().map(|r| !r.is_nan()).collect();

    let out = frame
        .with_column(settings.return_column(), forward)?
        .with_column(settings.direction_column(), direction)?
        .filter(&labelled);

    info!("Labelled {} rows with horizon {}", out.len(), horizon);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RowKey;
    use chrono::NaiveDate;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 3, d)
    }

    #[test]
    fn test_forward_return_uses_next_row_of_same_ticker() {
        // Interleaved on purpose: B sits between A's rows before sorting.
        let keys = vec![
            RowKey::new("A", day(1)),
            RowKey::new("B", day(1)),
            RowKey::new("A", day(3)),
            RowKey::new("B", day(2)),
            RowKey::new("A", day(2)),
        ];
        let frame = Frame::new(keys)
            .with_column("adj_close", vec![100.0, 50.0, 121.0, 40.0, 110.0])
            .unwrap();

        let labelled = attach_labels(&frame, &LabelSettings { horizon: 1 }).unwrap();

        assert_eq!(
            labelled.keys(),
            &[RowKey::new("A", day(1)), RowKey::new("A", day(2)), RowKey::new("B", day(1))]
        );
        let y = labelled.column("y_ret_1").unwrap();
        assert!((y[0] - 0.10).abs() < 1e-12, "110/100 - 1, not 121/110 - 1 shifted");
        assert!((y[1] - 0.10).abs() < 1e-12);
        assert!((y[2] + 0.20).abs() < 1e-12);
        assert_eq!(labelled.column("y_up_1").unwrap(), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_close_is_used_without_adjusted_close() {
        let frame = Frame::new(vec![RowKey::new("A", day(1)), RowKey::new("A", day(2)), RowKey::new("A", day(3))])
            .with_column("close", vec![10.0, 10.0, 12.0])
            .unwrap();

        let labelled = attach_labels(&frame, &LabelSettings { horizon: 2 }).unwrap();
        assert_eq!(labelled.len(), 1);
        assert!((labelled.column("y_ret_2").unwrap()[0] - 0.2).abs() < 1e-12);
        assert_eq!(labelled.column("y_up_2").unwrap(), &[1.0]);
    }

    #[test]
    fn test_flat_forward_return_is_not_up() {
        let frame = Frame::new(vec![RowKey::new("A", day(1)), RowKey::new("A", day(2))])
            .with_column("adj_close", vec![10.0, 10.0])
            .unwrap();
        let labelled = attach_labels(&frame, &LabelSettings::default()).unwrap();
        assert_eq!(labelled.column("y_up_1").unwrap(), &[0.0]);
    }

    #[test]
    fn test_missing_price_columns() {
        let frame = Frame::new(vec![RowKey::new("A", day(1))])
            .with_column("open", vec![1.0])
            .unwrap();
        match attach_labels(&frame, &LabelSettings::default()) {
            Err(EvalError::Schema { missing }) => assert_eq!(missing, vec!["adj_close", "close"]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }
}
