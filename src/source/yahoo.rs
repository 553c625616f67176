use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::PriceSource;
use crate::config::UniverseSettings;
use crate::data::RawTable;
use crate::error::{EvalError, Result};

const YAHOO_CHART_API: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) walkforward-baselines/0.1";

/// Multi-ticker time series layout emitted by this source.
pub const TIME_SERIES_HEADERS: [&str; 8] =
    ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume", "Ticker"];

/// Daily bars from the public Yahoo Finance chart endpoint, one request per
/// ticker, issued concurrently.
#[derive(Debug, Clone)]
pub struct YahooPriceSource {
    client: Client,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new() -> Result<Self> {
        Self::with_base_url(YAHOO_CHART_API)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_ticker(&self, ticker: &str, start: NaiveDate, end: Option<NaiveDate>) -> Result<RawTable> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end
            .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp())
            .unwrap_or_else(|| Utc::now().timestamp());
        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            self.base_url, ticker, period1, period2
        );
        debug!("GET {}", url);

        let resp: ChartEnvelope = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        chart_to_table(ticker, resp)
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch(&self, universe: &UniverseSettings) -> Result<RawTable> {
        info!(
            "Fetching daily prices for {:?} from {} to {}",
            universe.tickers,
            universe.start,
            universe.end.map(|d| d.to_string()).unwrap_or_else(|| "today".to_string())
        );

        let requests = universe
            .tickers
            .iter()
            .map(|t| self.fetch_ticker(t, universe.start, universe.end));
        let results = join_all(requests).await;

        let mut tables = Vec::new();
        for (ticker, result) in universe.tickers.iter().zip(results) {
            match result {
                Ok(table) if table.is_empty() => warn!("No rows returned for {}", ticker),
                Ok(table) => {
                    info!("Fetched {} daily bars for {}", table.len(), ticker);
                    tables.push(table);
                }
                Err(e) => warn!("Skipping {}: {}", ticker, e),
            }
        }

        if tables.is_empty() {
            return Err(EvalError::DataUnavailable(format!(
                "no rows for {:?}; check tickers or dates",
                universe.tickers
            )));
        }
        RawTable::concat(tables)
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn cell(values: &[Option<f64>], i: usize) -> String {
    values
        .get(i)
        .copied()
        .flatten()
        .map(|v| v.to_string())
        .unwrap_or_default()
}

fn chart_to_table(ticker: &str, envelope: ChartEnvelope) -> Result<RawTable> {
    if let Some(err) = envelope.chart.error {
        return Err(EvalError::Source(format!("{}: {} ({})", ticker, err.description, err.code)));
    }

    let headers = TIME_SERIES_HEADERS.iter().map(|h| h.to_string()).collect();
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return RawTable::new(headers, Vec::new());
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adj = result.indicators.adjclose.into_iter().next().unwrap_or_default();
    let offset = result.meta.gmtoffset;

    let mut records = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        // Exchange-local trading date.
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        records.push(vec![
            date,
            cell(&quote.open, i),
            cell(&quote.high, i),
            cell(&quote.low, i),
            cell(&quote.close, i),
            cell(&adj.adjclose, i),
            cell(&quote.volume, i),
            ticker.to_string(),
        ]);
    }
    RawTable::new(headers, records)
}
