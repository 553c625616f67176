use crate::error::{EvalError, Result};

#[cfg(test)]
use super::frame::Frame;

/// Untyped price export as handed over by a price source: header names in
/// the provider's scheme and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Result<Self> {
        if let Some((row, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != headers.len())
        {
            return Err(EvalError::Alignment(format!(
                "record {} has {} cells, expected {}",
                row,
                record.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Concatenates tables sharing the same header layout.
    pub fn concat(tables: Vec<RawTable>) -> Result<RawTable> {
        let mut iter = tables.into_iter();
        let Some(mut out) = iter.next() else {
            return Ok(RawTable::default());
        };
        for table in iter {
            if table.headers != out.headers {
                return Err(EvalError::Alignment(format!(
                    "cannot concatenate layouts {:?} and {:?}",
                    out.headers, table.headers
                )));
            }
            out.records.extend(table.records);
        }
        Ok(out)
    }

    /// Renders a frame back into canonical string cells (`ticker`, `date`,
    /// then every column). Invalid dates become empty cells.
    #[cfg(test)]
    pub fn from_frame(frame: &Frame) -> RawTable {
        let names: Vec<String> = frame.column_names().map(str::to_string).collect();
        let mut headers = vec!["ticker".to_string(), "date".to_string()];
        headers.extend(names.iter().cloned());

        let columns: Vec<&[f64]> = names
            .iter()
            .filter_map(|n| frame.column(n).ok())
            .collect();

        let records = frame
            .keys()
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let mut record = Vec::with_capacity(headers.len());
                record.push(key.ticker.clone());
                record.push(key.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default());
                record.extend(columns.iter().map(|col| col[i].to_string()));
                record
            })
            .collect();

        RawTable { headers, records }
    }
}
