//! In-memory collaborators for engine tests

use analysis_core::{
    AnalysisError, Bar, ChartSpan, Clock, ConstituentSource, Fundamentals, HistoricalSeries, IndexConfig,
    IndexConstituent, MarketDataProvider, Quote,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 3, 12, 15, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn quote(symbol: &str, price: f64, previous_close: Option<f64>) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        last_price: price,
        previous_close,
        updated_at: None,
    }
}

fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

/// Daily bars with high == close and constant volume
pub fn series_from_closes(symbol: &str, closes: &[f64]) -> HistoricalSeries {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: day(i),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000_000.0,
        })
        .collect();
    HistoricalSeries::new(symbol, bars).unwrap()
}

pub fn flat_series(symbol: &str, n: usize, close: f64) -> HistoricalSeries {
    series_from_closes(symbol, &vec![close; n])
}

pub fn constituent(symbol: &str, name: &str) -> IndexConstituent {
    IndexConstituent {
        symbol: symbol.to_string(),
        name: name.to_string(),
    }
}

pub fn json_index(key: &str) -> IndexConfig {
    IndexConfig::new(key, &key.to_uppercase(), &format!("mock://{}", key), analysis_core::ConstituentFormat::Json)
}

/// Market data held in maps. Anything missing errors like a provider would.
#[derive(Default)]
pub struct MockMarketData {
    pub quotes: HashMap<String, Quote>,
    pub series: HashMap<String, HistoricalSeries>,
    pub fundamentals: HashMap<String, Fundamentals>,
    /// Any quote batch containing one of these symbols fails
    pub failing_quote_symbols: HashSet<String>,
    pub max_batch: Option<usize>,
    pub quote_batches: Mutex<Vec<Vec<String>>>,
    pub historical_calls: Mutex<Vec<String>>,
    pub fundamentals_calls: Mutex<Vec<String>>,
    pub quote_outage: AtomicBool,
}

impl MockMarketData {
    pub fn with_stock(mut self, quote: Quote, series: HistoricalSeries, fundamentals: Option<Fundamentals>) -> Self {
        let symbol = quote.symbol.clone();
        self.quotes.insert(symbol.clone(), quote);
        self.series.insert(symbol.clone(), series);
        if let Some(f) = fundamentals {
            self.fundamentals.insert(symbol, f);
        }
        self
    }

    pub fn historical_calls(&self) -> Vec<String> {
        self.historical_calls.lock().unwrap().clone()
    }

    pub fn fundamentals_calls(&self) -> Vec<String> {
        self.fundamentals_calls.lock().unwrap().clone()
    }

    pub fn quote_batches(&self) -> Vec<Vec<String>> {
        self.quote_batches.lock().unwrap().clone()
    }

    pub fn set_quote_outage(&self, down: bool) {
        self.quote_outage.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, AnalysisError> {
        self.quote_batches.lock().unwrap().push(symbols.to_vec());

        if self.quote_outage.load(Ordering::SeqCst) {
            return Err(AnalysisError::ApiError("503 Service Unavailable".into()));
        }
        if symbols.iter().any(|s| self.failing_quote_symbols.contains(s)) {
            return Err(AnalysisError::ApiError("batch rejected".into()));
        }

        Ok(symbols.iter().filter_map(|s| self.quotes.get(s).cloned()).collect())
    }

    async fn fetch_historical(&self, symbol: &str, _span: ChartSpan) -> Result<HistoricalSeries, AnalysisError> {
        self.historical_calls.lock().unwrap().push(symbol.to_string());
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| AnalysisError::ApiError(format!("no historicals for {}", symbol)))
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError> {
        self.fundamentals_calls.lock().unwrap().push(symbol.to_string());
        self.fundamentals
            .get(symbol)
            .cloned()
            .ok_or_else(|| AnalysisError::ApiError(format!("no fundamentals for {}", symbol)))
    }

    fn max_quote_batch(&self) -> usize {
        self.max_batch.unwrap_or(1600)
    }
}

/// Constituent lists keyed by index key
#[derive(Default)]
pub struct MockConstituents {
    pub lists: HashMap<String, Vec<IndexConstituent>>,
    pub calls: AtomicUsize,
    pub outage: AtomicBool,
}

impl MockConstituents {
    pub fn with_index(mut self, key: &str, members: Vec<IndexConstituent>) -> Self {
        self.lists.insert(key.to_string(), members);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConstituentSource for MockConstituents {
    async fn fetch_constituents(&self, index: &IndexConfig) -> Result<Vec<IndexConstituent>, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.outage.load(Ordering::SeqCst) {
            return Err(AnalysisError::ApiError("constituent source down".into()));
        }
        self.lists
            .get(&index.key)
            .cloned()
            .ok_or_else(|| AnalysisError::ApiError(format!("unknown index {}", index.key)))
    }
}
