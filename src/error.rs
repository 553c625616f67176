use thiserror::Error;

/// Fatal failures of the evaluation pipeline.
///
/// Per-fold numerical edge cases (single-class AUC, zero-loss RSI windows,
/// short histories) are absorbed where they occur and never show up here.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("missing columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("no price data available: {0}")]
    DataUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("price source failure: {0}")]
    Source(String),

    #[error("column alignment: {0}")]
    Alignment(String),

    #[error("model fit failed: {0}")]
    Model(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl EvalError {
    pub fn missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut missing: Vec<String> = fields.into_iter().map(Into::into).collect();
        missing.sort();
        missing.dedup();
        EvalError::Schema { missing }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
