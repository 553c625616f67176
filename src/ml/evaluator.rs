use chrono::NaiveDate;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, info, warn};

use super::logistic::{LogisticParams, ProbabilityModel};
use super::metrics::{accuracy, log_loss, rmse, roc_auc, MetricSummary};
use super::ridge::RidgeRegression;
use crate::config::{LabelSettings, ModelSettings, SplitSettings};
use crate::data::Frame;
use crate::error::{EvalError, Result};
use crate::report::{ModelFamily, ScoreRow, ScoreTable};
use crate::splits::{expanding_window_splits, Split};

/// Fits and scores both baseline families on every walk-forward split of a
/// labelled feature table.
///
/// Each fold's scaler, model and calibration are fit on the fold's training
/// rows only; test rows are used for scoring and nothing else.
pub struct BaselineEvaluator {
    x: Array2<f64>,
    y_ret: Array1<f64>,
    y_up: Array1<bool>,
    splits: Vec<Split>,
    models: ModelSettings,
}

impl BaselineEvaluator {
    pub fn new(
        table: &Frame,
        feature_columns: &[String],
        labels: &LabelSettings,
        splits: &SplitSettings,
        models: ModelSettings,
    ) -> Result<Self> {
        let n = table.len();
        let mut x = Array2::<f64>::zeros((n, feature_columns.len()));
        for (j, name) in feature_columns.iter().enumerate() {
            let values = table.column(name)?;
            x.column_mut(j).assign(&Array1::from(values.to_vec()));
        }
        let y_ret = Array1::from(table.column(&labels.return_column())?.to_vec());
        let y_up = table
            .column(&labels.direction_column())?
            .iter()
            .map(|v| *v > 0.5)
            .collect::<Array1<bool>>();

        let dates: Vec<NaiveDate> = table
            .dates()
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EvalError::Alignment("labelled table holds invalid dates".to_string()))?;

        let generator = expanding_window_splits(&dates, splits.n_splits, splits.min_train_days);
        info!(
            "{} distinct dates, {:?} splits (n_splits={}, min_train_days={})",
            generator.distinct_dates(),
            generator.kind(),
            splits.n_splits,
            splits.min_train_days
        );

        let mut usable = Vec::new();
        for (i, split) in generator.enumerate() {
            if split.train.is_empty() || split.test.is_empty() {
                warn!(
                    "Split {} (cutoff {}) has {} train / {} test rows, skipping",
                    i,
                    split.train_end,
                    split.train.len(),
                    split.test.len()
                );
                continue;
            }
            debug!(
                "Split {}: train <= {} ({} rows), test to {:?} ({} rows)",
                i,
                split.train_end,
                split.train.len(),
                split.test_end,
                split.test.len()
            );
            usable.push(split);
        }

        Ok(Self {
            x,
            y_ret,
            y_up,
            splits: usable,
            models,
        })
    }

    fn rows(&self, indices: &[usize]) -> Array2<f64> {
        self.x.select(Axis(0), indices)
    }

    /// RMSE of standardised ridge regression on the forward return, one row
    /// per alpha.
    pub fn ridge_scores(&self) -> Result<Vec<ScoreRow>> {
        let mut rows = Vec::with_capacity(self.models.ridge_alphas.len());
        for &alpha in &self.models.ridge_alphas {
            let mut fold_rmse = Vec::with_capacity(self.splits.len());
            for split in &self.splits {
                let scaler = super::scaler::StandardScaler::fit(&self.rows(&split.train));
                let x_train = scaler.transform(&self.rows(&split.train));
                let x_test = scaler.transform(&self.rows(&split.test));

                let mut model = RidgeRegression::new(alpha);
                model.fit(&x_train, &self.y_ret.select(Axis(0), &split.train))?;
                let pred = model.predict(&x_test)?;
                fold_rmse.push(rmse(&self.y_ret.select(Axis(0), &split.test), &pred));
            }

            let row = ScoreRow::new(ModelFamily::Ridge, alpha, None, self.splits.len())
                .with_rmse(MetricSummary::from_folds(&fold_rmse));
            info!("Ridge alpha={}: rmse {}", alpha, row.describe_rmse());
            rows.push(row);
        }
        Ok(rows)
    }

    /// Accuracy, AUC and log-loss of the logistic classifier on the
    /// direction label, one row per C.
    pub fn logistic_scores(&self) -> Result<Vec<ScoreRow>> {
        let calibration_folds = self
            .models
            .calibrate
            .then_some(self.models.calibration_folds);

        let mut rows = Vec::with_capacity(self.models.logistic_cs.len());
        for &c in &self.models.logistic_cs {
            let params = LogisticParams {
                c,
                max_iterations: self.models.max_iterations,
                calibration_folds,
            };

            let (mut accs, mut aucs, mut losses) = (Vec::new(), Vec::new(), Vec::new());
            for (i, split) in self.splits.iter().enumerate() {
                let model = ProbabilityModel::fit(
                    &self.rows(&split.train),
                    &self.y_up.select(Axis(0), &split.train),
                    &params,
                )?;
                let prob = model.predict_proba(&self.rows(&split.test));
                let y_test = self.y_up.select(Axis(0), &split.test);

                accs.push(accuracy(&y_test, &prob));
                match roc_auc(&y_test, &prob) {
                    Some(auc) => aucs.push(auc),
                    None => warn!("C={} split {}: single-class test fold, AUC omitted", c, i),
                }
                losses.push(log_loss(&y_test, &prob));
            }

            let row = ScoreRow::new(ModelFamily::Logistic, c, Some(self.models.calibrate), self.splits.len())
                .with_accuracy(MetricSummary::from_folds(&accs))
                .with_auc(MetricSummary::from_folds(&aucs))
                .with_log_loss(MetricSummary::from_folds(&losses));
            info!("LogReg C={}: {}", c, row.describe_classification());
            rows.push(row);
        }
        Ok(rows)
    }

    /// Both families, ridge rows first.
    pub fn evaluate(&self) -> Result<ScoreTable> {
        let mut rows = self.ridge_scores()?;
        rows.extend(self.logistic_scores()?);
        Ok(ScoreTable::new(rows))
    }
}
