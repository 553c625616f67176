use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

use super::scaler::StandardScaler;
use crate::error::{EvalError, Result};

const LOGIT_CLIP: f64 = 1e-15;

/// Hyperparameters for one logistic baseline.
#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iterations: u64,
    /// Internal folds for sigmoid calibration; `None` disables it.
    pub calibration_folds: Option<usize>,
}

/// Scaler + logistic regression fit on the same rows.
pub enum ScaledClassifier {
    Linear {
        scaler: StandardScaler,
        model: FittedLogisticRegression<f64, bool>,
    },
    /// Training rows held a single class; predicts its base rate.
    Constant(f64),
}

impl ScaledClassifier {
    pub fn fit(x: &Array2<f64>, y: &Array1<bool>, params: &LogisticParams) -> Result<Self> {
        let positives = y.iter().filter(|v| **v).count();
        if positives == 0 || positives == y.len() {
            debug!("Single-class training rows ({} of {} positive)", positives, y.len());
            return Ok(ScaledClassifier::Constant(if positives == 0 { 0.0 } else { 1.0 }));
        }

        let scaler = StandardScaler::fit(x);
        let dataset = DatasetBase::new(scaler.transform(x), y.clone());
        let model = LogisticRegression::default()
            .alpha(1.0 / params.c)
            .max_iterations(params.max_iterations)
            .fit(&dataset)
            .map_err(|e| EvalError::Model(e.to_string()))?;
        Ok(ScaledClassifier::Linear { scaler, model })
    }

    /// Probability of `true`.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            ScaledClassifier::Linear { scaler, model } => {
                // linfa picks the more frequent training class as its positive label.
                let p = model.predict_probabilities(&scaler.transform(x));
                if model.labels().pos.class {
                    p
                } else {
                    p.mapv(|v| 1.0 - v)
                }
            }
            ScaledClassifier::Constant(p) => Array1::from_elem(x.nrows(), *p),
        }
    }

    /// Log-odds of the positive class, used as the calibration input.
    pub fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        self.predict_proba(x).mapv(|p| {
            let p = p.clamp(LOGIT_CLIP, 1.0 - LOGIT_CLIP);
            (p / (1.0 - p)).ln()
        })
    }
}

/// Platt scaling: `p = 1 / (1 + exp(-(a·f + b)))` over decision values `f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidCalibrator {
    pub a: f64,
    pub b: f64,
}

impl SigmoidCalibrator {
    /// Newton's method with backtracking on the cross-entropy against
    /// Platt's smoothed targets.
    pub fn fit(decision: &Array1<f64>, y: &Array1<bool>) -> Self {
        let positives = y.iter().filter(|v| **v).count() as f64;
        let negatives = y.len() as f64 - positives;
        let hi = (positives + 1.0) / (positives + 2.0);
        let lo = 1.0 / (negatives + 2.0);
        let target: Vec<f64> = y.iter().map(|v| if *v { hi } else { lo }).collect();

        let loss = |a: f64, b: f64| -> f64 {
            decision
                .iter()
                .zip(&target)
                .map(|(f, t)| {
                    let z = a * f + b;
                    // t·log(1+e^-z) + (1-t)·log(1+e^z), stable in both tails
                    let softplus_neg = (-z).max(0.0) + (-z.abs()).exp().ln_1p();
                    softplus_neg + (1.0 - t) * z
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((positives + 1.0) / (negatives + 1.0)).ln();
        let mut current = loss(a, b);

        for _ in 0..100 {
            let (mut ga, mut gb, mut haa, mut hab, mut hbb) = (0.0, 0.0, 1e-12, 0.0, 1e-12);
            for (f, t) in decision.iter().zip(&target) {
                let p = sigmoid(a * f + b);
                let w = p * (1.0 - p);
                ga += (p - t) * f;
                gb += p - t;
                haa += w * f * f;
                hab += w * f;
                hbb += w;
            }
            if ga.abs() < 1e-10 && gb.abs() < 1e-10 {
                break;
            }

            let det = haa * hbb - hab * hab;
            if det.abs() < f64::MIN_POSITIVE {
                break;
            }
            let da = (hbb * ga - hab * gb) / det;
            let db = (haa * gb - hab * ga) / det;

            let mut step = 1.0;
            let mut improved = false;
            while step > 1e-10 {
                let (na, nb) = (a - step * da, b - step * db);
                let candidate = loss(na, nb);
                if candidate <= current - 1e-4 * step * (ga * da + gb * db) {
                    a = na;
                    b = nb;
                    current = candidate;
                    improved = true;
                    break;
                }
                step /= 2.0;
            }
            if !improved {
                break;
            }
        }

        Self { a, b }
    }

    pub fn apply(&self, decision: &Array1<f64>) -> Array1<f64> {
        decision.mapv(|f| sigmoid(self.a * f + self.b))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub struct CalibratedMember {
    classifier: ScaledClassifier,
    calibrator: SigmoidCalibrator,
}

/// Probability model fit strictly on one training fold.
pub enum ProbabilityModel {
    Plain(ScaledClassifier),
    /// Average over members, each calibrated on a held-out slice of the
    /// training fold.
    Calibrated(Vec<CalibratedMember>),
}

impl ProbabilityModel {
    pub fn fit(x: &Array2<f64>, y: &Array1<bool>, params: &LogisticParams) -> Result<Self> {
        let Some(folds) = params.calibration_folds else {
            return Ok(ProbabilityModel::Plain(ScaledClassifier::fit(x, y, params)?));
        };

        let n = x.nrows();
        let mut members = Vec::with_capacity(folds);
        for fold in 0..folds {
            // Contiguous slices, earlier rows first.
            let start = fold * n / folds;
            let end = (fold + 1) * n / folds;
            let held: Vec<usize> = (start..end).collect();
            let rest: Vec<usize> = (0..start).chain(end..n).collect();
            if held.is_empty() || rest.is_empty() {
                continue;
            }

            let classifier = ScaledClassifier::fit(
                &x.select(Axis(0), &rest),
                &y.select(Axis(0), &rest),
                params,
            )?;
            let decision = classifier.decision_function(&x.select(Axis(0), &held));
            let calibrator = SigmoidCalibrator::fit(&decision, &y.select(Axis(0), &held));
            debug!("Calibration fold {}: a={:.4}, b={:.4}", fold, calibrator.a, calibrator.b);
            members.push(CalibratedMember { classifier, calibrator });
        }

        if members.is_empty() {
            warn!("Too few training rows to calibrate ({}), using the raw classifier", n);
            return Ok(ProbabilityModel::Plain(ScaledClassifier::fit(x, y, params)?));
        }
        Ok(ProbabilityModel::Calibrated(members))
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        match self {
            ProbabilityModel::Plain(classifier) => classifier.predict_proba(x),
            ProbabilityModel::Calibrated(members) => {
                let mut total = Array1::<f64>::zeros(x.nrows());
                for member in members {
                    total += &member.calibrator.apply(&member.classifier.decision_function(x));
                }
                total / members.len() as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable(n: usize) -> (Array2<f64>, Array1<bool>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let t = i as f64 / n as f64;
            if j == 0 { t * 4.0 - 2.0 + ((i * 7) % 5) as f64 * 0.3 } else { ((i * 13) % 11) as f64 }
        });
        let y = x.column(0).mapv(|v| v > 0.0);
        (x, y)
    }

    fn params(calibration_folds: Option<usize>) -> LogisticParams {
        LogisticParams {
            c: 1.0,
            max_iterations: 200,
            calibration_folds,
        }
    }

    #[test]
    fn test_plain_classifier_orders_by_signal() {
        let (x, y) = separable(120);
        let model = ProbabilityModel::fit(&x, &y, &params(None)).unwrap();
        assert!(matches!(model, ProbabilityModel::Plain(_)));

        let p = model.predict_proba(&array![[-3.0, 5.0], [3.0, 5.0]]);
        assert!(p[0] < 0.5 && p[1] > 0.5);
    }

    #[test]
    fn test_mostly_down_training_rows_still_score_up_probability() {
        let x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64 / 100.0);
        let y = x.column(0).mapv(|v| v >= 0.7);
        assert_eq!(y.iter().filter(|v| **v).count(), 30);

        let model = ProbabilityModel::fit(&x, &y, &params(None)).unwrap();
        let p = model.predict_proba(&array![[0.0], [1.0]]);
        assert!(p[1] > p[0], "P(up) must rise with the signal, got {:?}", p);
        assert!(p[0] < 0.5);

        let in_sample = model.predict_proba(&x);
        assert!(crate::ml::metrics::accuracy(&y, &in_sample) > 0.75);
    }

    #[test]
    fn test_calibrated_probabilities_stay_in_unit_interval() {
        let (x, y) = separable(150);
        let model = ProbabilityModel::fit(&x, &y, &params(Some(3))).unwrap();
        assert!(matches!(model, ProbabilityModel::Calibrated(_)));

        let p = model.predict_proba(&x);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(p[0] < p[149]);
    }

    #[test]
    fn test_single_class_training_predicts_base_rate() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![true, true, true];
        let model = ScaledClassifier::fit(&x, &y, &params(None)).unwrap();
        assert_eq!(model.predict_proba(&array![[0.0], [9.0]]), array![1.0, 1.0]);
    }

    #[test]
    fn test_sigmoid_calibrator_is_monotone_in_decision() {
        let decision = array![-3.0, -2.0, -1.0, -0.5, 0.5, 1.0, 2.0, 3.0, -0.2, 0.2];
        let y = array![false, false, false, true, false, true, true, true, false, true];
        let cal = SigmoidCalibrator::fit(&decision, &y);
        assert!(cal.a > 0.0);

        let p = cal.apply(&array![-1.0, 0.0, 1.0]);
        assert!(p[0] < p[1] && p[1] < p[2]);
    }
}
