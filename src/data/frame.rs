use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

use crate::error::{EvalError, Result};

/// Join key carried through every transformation of the panel.
/// `date == None` marks a value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub ticker: String,
    pub date: Option<NaiveDate>,
}

impl RowKey {
    pub fn new(ticker: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            ticker: ticker.into(),
            date,
        }
    }
}

impl Ord for RowKey {
    // Invalid dates sort after every valid date of the same ticker.
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticker.cmp(&other.ticker).then_with(|| match (self.date, other.date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Columnar panel: one key per row, one numeric column per field name.
///
/// Frames are never mutated in place by the pipeline stages. Every
/// operation returns a new frame whose columns are permuted or filtered
/// together with the keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    keys: Vec<RowKey>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl Frame {
    pub fn new(keys: Vec<RowKey>) -> Self {
        Self {
            keys,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn dates(&self) -> Vec<Option<NaiveDate>> {
        self.keys.iter().map(|k| k.date).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    #[cfg(test)]
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EvalError::missing([name]))
    }

    /// Appends a column. A name that is already present keeps its existing
    /// values (first occurrence wins).
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.keys.len() {
            return Err(EvalError::Alignment(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.keys.len()
            )));
        }
        if self.columns.contains_key(&name) {
            debug!("Column '{}' already present, keeping first occurrence", name);
            return Ok(self);
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    pub fn select_rows(&self, indices: &[usize]) -> Frame {
        let keys = indices.iter().map(|&i| self.keys[i].clone()).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), indices.iter().map(|&i| values[i]).collect()))
            .collect();
        Frame { keys, columns }
    }

    pub fn filter(&self, mask: &[bool]) -> Frame {
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        self.select_rows(&indices)
    }

    pub fn is_sorted(&self) -> bool {
        self.keys.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort by (ticker, date).
    pub fn sorted(&self) -> Frame {
        if self.is_sorted() {
            return self.clone();
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.keys[a].cmp(&self.keys[b]));
        self.select_rows(&order)
    }

    /// Row ranges of consecutive rows sharing a ticker.
    pub fn ticker_blocks(&self) -> Vec<Range<usize>> {
        let mut blocks = Vec::new();
        let mut start = 0;
        for i in 1..=self.keys.len() {
            if i == self.keys.len() || self.keys[i].ticker != self.keys[start].ticker {
                if i > start {
                    blocks.push(start..i);
                }
                start = i;
            }
        }
        blocks
    }

    /// True where every column holds a finite value.
    pub fn complete_rows(&self) -> Vec<bool> {
        (0..self.len())
            .map(|i| self.columns.values().all(|col| col[i].is_finite()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ticker: &str, day: Option<u32>) -> RowKey {
        RowKey::new(ticker, day.and_then(|d| NaiveDate::from_ymd_opt(2024, 1, d)))
    }

    #[test]
    fn test_invalid_dates_sort_last_within_ticker() {
        let frame = Frame::new(vec![key("B", Some(1)), key("A", None), key("A", Some(3)), key("A", Some(2))])
            .with_column("x", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();

        let sorted = frame.sorted();
        assert_eq!(
            sorted.keys(),
            &[key("A", Some(2)), key("A", Some(3)), key("A", None), key("B", Some(1))]
        );
        assert_eq!(sorted.column("x").unwrap(), &[4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_first_column_occurrence_wins() {
        let frame = Frame::new(vec![key("A", Some(1))])
            .with_column("close", vec![1.0])
            .unwrap()
            .with_column("close", vec![2.0])
            .unwrap();
        assert_eq!(frame.column("close").unwrap(), &[1.0]);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let result = Frame::new(vec![key("A", Some(1))]).with_column("x", vec![1.0, 2.0]);
        assert!(matches!(result, Err(EvalError::Alignment(_))));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let frame = Frame::new(vec![key("A", Some(1))]);
        match frame.column("adj_close") {
            Err(EvalError::Schema { missing }) => assert_eq!(missing, vec!["adj_close"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ticker_blocks_and_filter() {
        let frame = Frame::new(vec![key("A", Some(1)), key("A", Some(2)), key("B", Some(1))])
            .with_column("x", vec![1.0, f64::NAN, 3.0])
            .unwrap();
        assert_eq!(frame.ticker_blocks(), vec![0..2, 2..3]);

        let kept = frame.filter(&frame.complete_rows());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.keys()[1], key("B", Some(1)));
        assert!(Frame::default().ticker_blocks().is_empty());
    }
}
