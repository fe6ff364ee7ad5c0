use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AnalysisError, ChartSpan, Fundamentals, HistoricalSeries, IndexConfig, IndexConstituent, Quote};

/// Quotes, historicals and fundamentals provider
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch quotes for one request-sized batch. Unknown symbols are simply
    /// missing from the result.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, AnalysisError>;

    async fn fetch_historical(&self, symbol: &str, span: ChartSpan) -> Result<HistoricalSeries, AnalysisError>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError>;

    /// Largest batch a single `fetch_quotes` call accepts
    fn max_quote_batch(&self) -> usize {
        1600
    }
}

/// Source of index constituent lists
#[async_trait]
pub trait ConstituentSource: Send + Sync {
    /// Fetch and normalize the constituents of one index
    async fn fetch_constituents(&self, index: &IndexConfig) -> Result<Vec<IndexConstituent>, AnalysisError>;
}

/// Time source for cache expiry and result timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
