pub mod csv_file;
pub mod yahoo;

pub use csv_file::*;
pub use yahoo::*;

use async_trait::async_trait;

use crate::config::{Provider, UniverseSettings};
use crate::data::RawTable;
use crate::error::{EvalError, Result};

/// Supplier of raw daily OHLCV exports for a ticker universe.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, universe: &UniverseSettings) -> Result<RawTable>;
}

pub fn source_for(universe: &UniverseSettings) -> Result<Box<dyn PriceSource>> {
    match universe.provider {
        Provider::Yahoo => Ok(Box::new(YahooPriceSource::new()?)),
        Provider::Csv => {
            let path = universe
                .csv_path
                .clone()
                .ok_or_else(|| EvalError::Config("provider 'csv' needs csv_path".to_string()))?;
            Ok(Box::new(CsvPriceSource::new(path)))
        }
    }
}
