use anyhow::Context;
use tracing::info;

use crate::config::EvalConfig;
use crate::data::{build_panel, RawTable};
use crate::error::Result;
use crate::features::build_feature_table;
use crate::labels::attach_labels;
use crate::ml::BaselineEvaluator;
use crate::report::ScoreTable;
use crate::source::source_for;

/// Runs panel construction, features, labels and walk-forward scoring on an
/// already fetched raw export.
pub fn evaluate_raw(raw: &RawTable, config: &EvalConfig) -> Result<ScoreTable> {
    let panel = build_panel(raw)?;
    let features = build_feature_table(&panel, &config.features)?;
    let labelled = attach_labels(&features, &config.labels)?;
    info!(
        "Labelled table: {} rows, horizon {}",
        labelled.len(),
        config.labels.horizon
    );

    let evaluator = BaselineEvaluator::new(
        &labelled,
        &config.features.feature_columns(),
        &config.labels,
        &config.splits,
        config.models.clone(),
    )?;
    evaluator.evaluate()
}

/// Fetches the configured universe, scores every baseline and writes the
/// score table once all models have finished.
pub async fn run(config: &EvalConfig) -> anyhow::Result<ScoreTable> {
    let source = source_for(&config.universe)?;
    info!(
        "Fetching {} tickers from {} ({} to {})",
        config.universe.tickers.len(),
        source.name(),
        config.universe.start,
        config
            .universe
            .end
            .map(|d| d.to_string())
            .unwrap_or_else(|| "today".to_string())
    );

    let raw = source
        .fetch(&config.universe)
        .await
        .with_context(|| format!("fetching prices from {}", source.name()))?;
    info!("Fetched {} raw rows", raw.len());

    let table = evaluate_raw(&raw, config).context("walk-forward evaluation failed")?;

    let path = config.output.path();
    table
        .write_csv(&path)
        .with_context(|| format!("writing scores to {}", path.display()))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use chrono::{Datelike, Duration, NaiveDate, Weekday};

    const BLOOMBERG_HEADERS: [&str; 8] = [
        "Security", "Date", "PX_OPEN", "PX_HIGH", "PX_LOW", "PX_LAST", "PX_ADJ_CLOSE", "VOLUME",
    ];

    fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut day = start;
        while days.len() < count {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(day);
            }
            day += Duration::days(1);
        }
        days
    }

    /// Smooth trend plus a ticker-shifted cycle and a deterministic wobble.
    fn synthetic_export(days: usize) -> RawTable {
        let dates = business_days(NaiveDate::from_ymd_opt(2019, 1, 2).unwrap(), days);
        let mut records = Vec::new();
        for (k, ticker) in ["NVDA", "AVGO", "QCOM", "AMD"].iter().enumerate() {
            for (t, date) in dates.iter().enumerate() {
                let x = t as f64;
                let wobble = (((t * 7919 + k * 104_729) % 1000) as f64 / 1000.0 - 0.5) * 0.02;
                let price = 100.0 * (0.0004 * x + 0.05 * (x / 9.0 + k as f64).sin() + wobble).exp();
                records.push(vec![
                    ticker.to_string(),
                    date.format("%Y-%m-%d").to_string(),
                    format!("{:.4}", price * 0.995),
                    format!("{:.4}", price * 1.01),
                    format!("{:.4}", price * 0.99),
                    format!("{:.4}", price),
                    format!("{:.4}", price),
                    format!("{}", 1_000_000 + t * 10),
                ]);
            }
        }
        let headers = BLOOMBERG_HEADERS.iter().map(|h| h.to_string()).collect();
        RawTable::new(headers, records).unwrap()
    }

    #[test]
    fn test_three_years_of_four_tickers() {
        let config = EvalConfig::default();
        let table = evaluate_raw(&synthetic_export(780), &config).unwrap();

        let rows = table.rows();
        assert_eq!(rows.len(), 6);
        for row in &rows[..3] {
            assert_eq!(row.model, "Ridge");
            assert_eq!(row.n_folds, 5);
            assert!(row.rmse_mean.unwrap().is_finite());
        }
        for row in &rows[3..] {
            assert_eq!(row.model, "LogReg");
            assert_eq!(row.calibrated, Some(true));
            let acc = row.acc_mean.unwrap();
            assert!((0.0..=1.0).contains(&acc));
            assert!(row.logloss_mean.unwrap().is_finite());
            match row.auc_mean {
                Some(auc) => assert!(auc.is_finite()),
                None => assert!(row.auc_folds.unwrap() < row.n_folds),
            }
        }
    }

    #[test]
    fn test_history_within_training_window_scores_nothing() {
        let mut config = EvalConfig::default();
        config.models.calibrate = false;
        config.splits.min_train_days = 200;
        // About 130 dates survive features and labels; the single fallback
        // cut lands on the last date and leaves no test rows.
        let table = evaluate_raw(&synthetic_export(141), &config).unwrap();
        assert_eq!(table.len(), 6);
        for row in table.rows() {
            assert_eq!(row.n_folds, 0);
            assert!(row.rmse_mean.is_none() && row.acc_mean.is_none());
        }
    }

    #[tokio::test]
    async fn test_run_reads_csv_and_writes_scores() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prices.csv");
        let raw = synthetic_export(400);

        let mut writer = csv::Writer::from_path(&input).unwrap();
        writer.write_record(raw.headers()).unwrap();
        for record in raw.records() {
            writer.write_record(record).unwrap();
        }
        writer.flush().unwrap();

        let mut config = EvalConfig::default();
        config.universe.provider = Provider::Csv;
        config.universe.csv_path = Some(input);
        config.models.calibrate = false;
        config.output.dir = dir.path().join("processed");

        let table = run(&config).await.unwrap();
        assert_eq!(table.len(), 6);

        let written = std::fs::read_to_string(config.output.path()).unwrap();
        assert_eq!(written.lines().count(), 7);
        assert!(written.starts_with("model,param,value,calibrated,n_folds"));
    }
}
