use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub universe: UniverseSettings,
    pub features: FeatureSettings,
    pub labels: LabelSettings,
    pub splits: SplitSettings,
    pub models: ModelSettings,
    pub output: OutputSettings,
}

impl EvalConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Universe validation
        if self.universe.tickers.is_empty() {
            errors.push("universe: at least one ticker is required".to_string());
        }
        if let Some(end) = self.universe.end {
            if end <= self.universe.start {
                errors.push("universe: end must be after start".to_string());
            }
        }
        if self.universe.provider == Provider::Csv && self.universe.csv_path.is_none() {
            errors.push("universe: provider 'csv' needs csv_path".to_string());
        }

        // Feature validation
        if self.features.return_lags.is_empty() || self.features.return_lags.contains(&0) {
            errors.push("features: return_lags must be non-empty and > 0".to_string());
        }
        if !self.features.return_lags.contains(&1) {
            errors.push("features: return_lags must include 1 (volatility input)".to_string());
        }
        if self.features.volatility_window < 2 {
            errors.push("features: volatility_window must be >= 2".to_string());
        }
        if self.features.rsi_window == 0 {
            errors.push("features: rsi_window must be > 0".to_string());
        }

        if self.labels.horizon == 0 {
            errors.push("labels: horizon must be > 0".to_string());
        }

        if self.splits.n_splits == 0 {
            errors.push("splits: n_splits must be > 0".to_string());
        }

        // Model validation
        if self.models.ridge_alphas.iter().any(|a| !a.is_finite() || *a < 0.0) {
            errors.push("models: ridge_alphas must be finite and >= 0".to_string());
        }
        if self.models.logistic_cs.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            errors.push("models: logistic_cs must be finite and > 0".to_string());
        }
        if self.models.calibrate && self.models.calibration_folds < 2 {
            errors.push("models: calibration_folds must be >= 2".to_string());
        }
        if self.models.max_iterations == 0 {
            errors.push("models: max_iterations must be > 0".to_string());
        }

        if self.output.file_name.trim().is_empty() {
            errors.push("output: file_name must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSettings {
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub provider: Provider,
    pub csv_path: Option<PathBuf>,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self {
            tickers: vec![
                "NVDA".to_string(),
                "AVGO".to_string(),
                "QCOM".to_string(),
                "AMD".to_string(),
            ],
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end: None,
            provider: Provider::Yahoo,
            csv_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub return_lags: Vec<usize>,
    pub volatility_window: usize,
    pub rsi_window: usize,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            return_lags: vec![1, 5, 10],
            volatility_window: 10,
            rsi_window: 5,
        }
    }
}

impl FeatureSettings {
    /// Model inputs in a fixed order: returns by lag, volatility, oscillator.
    pub fn feature_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self.return_lags.iter().map(|k| format!("ret{}", k)).collect();
        cols.push(format!("rv{}", self.volatility_window));
        cols.push(format!("rsi{}", self.rsi_window));
        cols
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    pub horizon: usize,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self { horizon: 1 }
    }
}

impl LabelSettings {
    pub fn return_column(&self) -> String {
        format!("y_ret_{}", self.horizon)
    }

    pub fn direction_column(&self) -> String {
        format!("y_up_{}", self.horizon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    pub n_splits: usize,
    pub min_train_days: usize,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            n_splits: 5,
            min_train_days: 252,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub ridge_alphas: Vec<f64>,
    pub logistic_cs: Vec<f64>,
    pub calibrate: bool,
    pub calibration_folds: usize,
    pub max_iterations: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            ridge_alphas: vec![0.1, 1.0, 10.0],
            logistic_cs: vec![1.0, 0.5, 0.1],
            calibrate: true,
            calibration_folds: 3,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub file_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/processed"),
            file_name: "baseline_cv_scores.csv".to_string(),
        }
    }
}

impl OutputSettings {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EvalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.universe.tickers.len(), 4);
        assert_eq!(config.splits.min_train_days, 252);
        assert_eq!(config.models.ridge_alphas, vec![0.1, 1.0, 10.0]);
        assert_eq!(config.models.logistic_cs, vec![1.0, 0.5, 0.1]);
    }

    #[test]
    fn test_feature_columns_follow_windows() {
        let features = FeatureSettings::default();
        assert_eq!(
            features.feature_columns(),
            vec!["ret1", "ret5", "ret10", "rv10", "rsi5"]
        );
        let labels = LabelSettings { horizon: 3 };
        assert_eq!(labels.return_column(), "y_ret_3");
        assert_eq!(labels.direction_column(), "y_up_3");
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut config = EvalConfig::default();
        config.labels.horizon = 0;
        config.splits.n_splits = 0;
        config.models.logistic_cs = vec![0.0];
        config.universe.provider = Provider::Csv;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("csv_path")));
    }
}
