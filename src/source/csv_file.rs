use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::PriceSource;
use crate::config::UniverseSettings;
use crate::data::RawTable;
use crate::error::{EvalError, Result};

/// Reads a Bloomberg-style daily export. The file is taken as-is; the
/// configured universe only matters to remote sources.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(bytes: &[u8]) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record?.iter().map(str::to_string).collect());
        }
        RawTable::new(headers, records)
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn fetch(&self, _universe: &UniverseSettings) -> Result<RawTable> {
        let bytes = tokio::fs::read(&self.path).await?;
        let table = Self::parse(&bytes)?;
        if table.is_empty() {
            return Err(EvalError::DataUnavailable(format!(
                "{} contains no rows",
                self.path.display()
            )));
        }
        info!("Read {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }
}
