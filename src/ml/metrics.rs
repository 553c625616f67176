use ndarray::Array1;

/// Probability clip used by `log_loss`.
pub const PROB_EPSILON: f64 = f64::EPSILON;

pub fn rmse(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    let n = actual.len().max(1) as f64;
    let sse: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sse / n).sqrt()
}

/// Share of rows where `p >= 0.5` agrees with the label.
pub fn accuracy(actual: &Array1<bool>, probability: &Array1<f64>) -> f64 {
    let n = actual.len().max(1) as f64;
    let hits = actual
        .iter()
        .zip(probability.iter())
        .filter(|(y, p)| (**p >= 0.5) == **y)
        .count();
    hits as f64 / n
}

/// Area under the ROC curve via the Mann-Whitney statistic with average
/// ranks for tied scores. `None` when only one class is present.
pub fn roc_auc(actual: &Array1<bool>, score: &Array1<f64>) -> Option<f64> {
    let positives = actual.iter().filter(|y| **y).count();
    let negatives = actual.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..score.len()).collect();
    order.sort_by(|&a, &b| score[a].total_cmp(&score[b]));

    let mut ranks = vec![0.0; score.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && score[order[j + 1]] == score[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their average.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = actual
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y)
        .map(|(_, r)| *r)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Mean binary cross-entropy with probabilities clipped to `[ε, 1 - ε]`.
pub fn log_loss(actual: &Array1<bool>, probability: &Array1<f64>) -> f64 {
    let n = actual.len().max(1) as f64;
    let total: f64 = actual
        .iter()
        .zip(probability.iter())
        .map(|(y, p)| {
            let p = p.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
            if *y {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / n
}

/// Mean and population standard deviation across folds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub mean: f64,
    pub std: f64,
    pub folds: usize,
}

impl MetricSummary {
    pub fn from_folds(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: var.sqrt(),
            folds: values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rmse() {
        let value = rmse(&array![1.0, 2.0, 3.0], &array![1.0, 2.0, 5.0]);
        assert!((value - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_threshold_is_inclusive() {
        let y = array![true, false, true, false];
        let p = array![0.5, 0.49, 0.2, 0.9];
        assert_eq!(accuracy(&y, &p), 0.5);
    }

    #[test]
    fn test_auc_perfect_random_and_ties() {
        let y = array![false, false, true, true];
        assert_eq!(roc_auc(&y, &array![0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&y, &array![0.9, 0.8, 0.2, 0.1]), Some(0.0));
        assert_eq!(roc_auc(&y, &array![0.5, 0.5, 0.5, 0.5]), Some(0.5));
        // One positive outranks one negative and ties the other.
        assert_eq!(roc_auc(&array![false, false, true], &array![0.1, 0.7, 0.7]), Some(0.75));
    }

    #[test]
    fn test_auc_undefined_for_single_class() {
        assert_eq!(roc_auc(&array![true, true], &array![0.3, 0.6]), None);
    }

    #[test]
    fn test_log_loss_clips_certain_mistakes() {
        let loss = log_loss(&array![true, false], &array![0.0, 0.0]);
        assert!(loss.is_finite());
        assert!((loss - (-(f64::EPSILON).ln() / 2.0)).abs() < 1e-9);

        let half = log_loss(&array![true, false], &array![0.5, 0.5]);
        assert!((half - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_summary_uses_population_std() {
        let s = MetricSummary::from_folds(&[1.0, 3.0]).unwrap();
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.std, 1.0);
        assert_eq!(s.folds, 2);
        assert!(MetricSummary::from_folds(&[]).is_none());
    }
}
