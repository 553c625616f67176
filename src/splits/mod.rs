//! Expanding-window walk-forward splits over a shared date axis.
//!
//! Cutoffs are chosen on the sorted set of distinct dates and applied to
//! every row, so all tickers are partitioned at the same calendar date and
//! no test row is dated on or before its split's training cutoff.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// One of `n_splits` evenly spaced expanding-window folds.
    WalkForward,
    /// Fallback used when the history is no longer than the minimum
    /// training window: a single train/test cut at that window.
    SingleFold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub train_end: NaiveDate,
    pub test_end: Option<NaiveDate>,
    pub kind: SplitKind,
}

/// Lazily yields splits in increasing cutoff order.
#[derive(Debug, Clone)]
pub struct ExpandingWindowSplits<'a> {
    dates: &'a [NaiveDate],
    unique: Vec<NaiveDate>,
    cuts: Vec<usize>,
    step: usize,
    kind: SplitKind,
    next: usize,
}

pub fn expanding_window_splits(
    dates: &[NaiveDate],
    n_splits: usize,
    min_train_days: usize,
) -> ExpandingWindowSplits<'_> {
    let mut unique = dates.to_vec();
    unique.sort_unstable();
    unique.dedup();
    let d = unique.len();

    let (cuts, step, kind) = if d == 0 {
        (Vec::new(), 1, SplitKind::SingleFold)
    } else if d <= min_train_days + 1 {
        // Not enough history to walk forward. A window longer than the
        // history is clamped to the last date, leaving an empty test set.
        (vec![min_train_days.min(d - 1)], 1, SplitKind::SingleFold)
    } else {
        let step = ((d - min_train_days) / n_splits.max(1)).max(1);
        (linspace_cuts(min_train_days, d - 2, n_splits), step, SplitKind::WalkForward)
    };

    ExpandingWindowSplits {
        dates,
        unique,
        cuts,
        step,
        kind,
        next: 0,
    }
}

/// `n` indices evenly spaced over `[start, stop]`, truncated toward zero,
/// first exactly `start` and last exactly `stop`.
fn linspace_cuts(start: usize, stop: usize, n: usize) -> Vec<usize> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let delta = (stop - start) as f64 / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        (start as f64 + i as f64 * delta) as usize
                    }
                })
                .collect()
        }
    }
}

impl<'a> ExpandingWindowSplits<'a> {
    pub fn distinct_dates(&self) -> usize {
        self.unique.len()
    }

    pub fn kind(&self) -> SplitKind {
        self.kind
    }

    fn rows_where<F: Fn(NaiveDate) -> bool>(&self, keep: F) -> Vec<usize> {
        self.dates
            .iter()
            .enumerate()
            .filter_map(|(i, d)| keep(*d).then_some(i))
            .collect()
    }

    fn single_fold(&self, cut: usize) -> Split {
        let train_end = self.unique[cut];
        let test = self.rows_where(|d| d > train_end);
        Split {
            train: self.rows_where(|d| d <= train_end),
            test_end: if test.is_empty() { None } else { self.unique.last().copied() },
            test,
            train_end,
            kind: SplitKind::SingleFold,
        }
    }

    fn walk_forward(&self, cut: usize) -> Split {
        let last = self.unique.len() - 1;
        let train_end = self.unique[cut];
        let mut test_end = self.unique[(cut + self.step).min(last)];

        let mut test = self.rows_where(|d| d > train_end && d <= test_end);
        if test.is_empty() {
            test = self.rows_where(|d| d > train_end);
            test_end = self.unique[last];
        }

        Split {
            train: self.rows_where(|d| d <= train_end),
            test,
            train_end,
            test_end: Some(test_end),
            kind: SplitKind::WalkForward,
        }
    }
}

impl Iterator for ExpandingWindowSplits<'_> {
    type Item = Split;

    fn next(&mut self) -> Option<Split> {
        let cut = *self.cuts.get(self.next)?;
        self.next += 1;
        Some(match self.kind {
            SplitKind::SingleFold => self.single_fold(cut),
            SplitKind::WalkForward => self.walk_forward(cut),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.cuts.len() - self.next;
        (left, Some(left))
    }
}
