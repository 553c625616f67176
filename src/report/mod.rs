use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::ml::MetricSummary;

/// Baseline families scored by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Ridge,
    Logistic,
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Ridge => "Ridge",
            ModelFamily::Logistic => "LogReg",
        }
    }

    /// Name of the regularisation hyperparameter.
    pub fn param_name(&self) -> &'static str {
        match self {
            ModelFamily::Ridge => "alpha",
            ModelFamily::Logistic => "C",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One row of the score table. Metrics that do not apply to the family, or
/// that were undefined on every fold, stay empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub model: String,
    pub param: String,
    pub value: f64,
    pub calibrated: Option<bool>,
    pub n_folds: usize,
    pub rmse_mean: Option<f64>,
    pub rmse_std: Option<f64>,
    pub acc_mean: Option<f64>,
    pub acc_std: Option<f64>,
    pub auc_mean: Option<f64>,
    pub auc_std: Option<f64>,
    pub auc_folds: Option<usize>,
    pub logloss_mean: Option<f64>,
    pub logloss_std: Option<f64>,
}

impl ScoreRow {
    pub fn new(family: ModelFamily, value: f64, calibrated: Option<bool>, n_folds: usize) -> Self {
        Self {
            model: family.name().to_string(),
            param: family.param_name().to_string(),
            value,
            calibrated,
            n_folds,
            rmse_mean: None,
            rmse_std: None,
            acc_mean: None,
            acc_std: None,
            auc_mean: None,
            auc_std: None,
            auc_folds: None,
            logloss_mean: None,
            logloss_std: None,
        }
    }

    pub fn with_rmse(mut self, summary: Option<MetricSummary>) -> Self {
        self.rmse_mean = summary.map(|s| s.mean);
        self.rmse_std = summary.map(|s| s.std);
        self
    }

    pub fn with_accuracy(mut self, summary: Option<MetricSummary>) -> Self {
        self.acc_mean = summary.map(|s| s.mean);
        self.acc_std = summary.map(|s| s.std);
        self
    }

    pub fn with_auc(mut self, summary: Option<MetricSummary>) -> Self {
        self.auc_mean = summary.map(|s| s.mean);
        self.auc_std = summary.map(|s| s.std);
        self.auc_folds = Some(summary.map_or(0, |s| s.folds));
        self
    }

    pub fn with_log_loss(mut self, summary: Option<MetricSummary>) -> Self {
        self.logloss_mean = summary.map(|s| s.mean);
        self.logloss_std = summary.map(|s| s.std);
        self
    }

    pub fn describe_rmse(&self) -> String {
        pair(self.rmse_mean, self.rmse_std, 6)
    }

    pub fn describe_classification(&self) -> String {
        format!(
            "acc {}, auc {} ({}/{} folds), logloss {}",
            pair(self.acc_mean, self.acc_std, 4),
            pair(self.auc_mean, self.auc_std, 4),
            self.auc_folds.unwrap_or(0),
            self.n_folds,
            pair(self.logloss_mean, self.logloss_std, 4)
        )
    }
}

fn pair(mean: Option<f64>, std: Option<f64>, precision: usize) -> String {
    match (mean, std) {
        (Some(m), Some(s)) => format!("{:.*} ± {:.*}", precision, m, precision, s),
        _ => "n/a".to_string(),
    }
}

/// All rows of one evaluation run, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    rows: Vec<ScoreRow>,
}

impl ScoreTable {
    pub fn new(rows: Vec<ScoreRow>) -> Self {
        Self { rows }
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[ScoreRow] {
        &self.rows
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Writes the table as CSV with a header row, creating parent
    /// directories as needed. Overwrites any existing file.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("Wrote {} score rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(72));
        println!("                  WALK-FORWARD BASELINE SCORES");
        println!("{}", "=".repeat(72));

        let (ridge, logistic): (Vec<&ScoreRow>, Vec<&ScoreRow>) =
            self.rows.iter().partition(|r| r.model == ModelFamily::Ridge.name());

        if !ridge.is_empty() {
            println!("REGRESSION (forward return)");
            for row in ridge {
                println!(
                    "  {:<7} {}={:<6} RMSE {}  [{} folds]",
                    row.model,
                    row.param,
                    row.value,
                    row.describe_rmse(),
                    row.n_folds
                );
            }
            println!("{}", "-".repeat(72));
        }

        if !logistic.is_empty() {
            println!("CLASSIFICATION (direction)");
            for row in logistic {
                let calibrated = match row.calibrated {
                    Some(true) => " calibrated",
                    _ => "",
                };
                println!("  {:<7} {}={:<6}{}", row.model, row.param, row.value, calibrated);
                println!("    {}", row.describe_classification());
            }
        }
        println!("{}", "=".repeat(72));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ScoreTable {
        let summary = MetricSummary::from_folds(&[0.01, 0.03]);
        ScoreTable::new(vec![
            ScoreRow::new(ModelFamily::Ridge, 0.1, None, 2).with_rmse(summary),
            ScoreRow::new(ModelFamily::Logistic, 1.0, Some(true), 2)
                .with_accuracy(MetricSummary::from_folds(&[0.5, 0.6]))
                .with_auc(MetricSummary::from_folds(&[0.55]))
                .with_log_loss(MetricSummary::from_folds(&[0.69, 0.70])),
        ])
    }

    #[test]
    fn test_family_names() {
        assert_eq!(ModelFamily::Ridge.to_string(), "Ridge");
        assert_eq!(ModelFamily::Logistic.param_name(), "C");
    }

    #[test]
    fn test_auc_folds_recorded_even_when_undefined() {
        let row = ScoreRow::new(ModelFamily::Logistic, 0.5, Some(false), 3).with_auc(None);
        assert_eq!(row.auc_folds, Some(0));
        assert!(row.auc_mean.is_none());
        assert!(row.describe_classification().contains("0/3 folds"));
    }

    #[test]
    fn test_write_csv_creates_directories_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.csv");
        sample_table().write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "model,param,value,calibrated,n_folds,rmse_mean,rmse_std,acc_mean,acc_std,\
             auc_mean,auc_std,auc_folds,logloss_mean,logloss_std"
        );
        let ridge = lines.next().unwrap();
        assert!(ridge.starts_with("Ridge,alpha,0.1,,2,0.02,"));
        let logistic = lines.next().unwrap();
        assert!(logistic.starts_with("LogReg,C,1.0,true,2,,,"));
        assert!(lines.next().is_none());
    }
}
