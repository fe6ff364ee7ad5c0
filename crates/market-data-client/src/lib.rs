//! HTTP client for quotes, historicals and fundamentals, plus index
//! constituent list fetching.

pub mod constituents;
pub mod wire;

use analysis_core::{AnalysisError, ChartSpan, Fundamentals, HistoricalSeries, MarketDataProvider, Quote};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use constituents::{default_indices, normalize_symbol, IndexListClient};
use wire::{FundamentalsRecord, HistoricalsResponse, QuotesResponse};

pub const QUOTES_URL: &str = "https://api.robinhood.com/quotes/";
pub const HISTORICALS_URL: &str = "https://api.robinhood.com/quotes/historicals/";
pub const FUNDAMENTALS_URL: &str = "https://api.robinhood.com/fundamentals/";

/// The quotes endpoint rejects requests above ~1630 symbols
pub const MAX_QUOTE_BATCH: usize = 1600;

/// Spaces requests evenly: one slot every `interval`. Callers reserve the
/// next free slot under the lock and sleep outside it.
#[derive(Clone)]
struct RateLimiter {
    next_slot: Arc<Mutex<Instant>>,
    interval: Duration,
}

impl RateLimiter {
    fn per_minute(requests: usize) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(Instant::now())),
            interval: Duration::from_secs(60) / requests.max(1) as u32,
        }
    }

    async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

const MAX_ATTEMPTS: u32 = 3;

/// Wait before retrying a 429: the server's `Retry-After` seconds when given,
/// otherwise 5s per attempt made so far.
fn retry_delay(retry_after: Option<&str>, attempt: u32) -> Duration {
    retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(5 * u64::from(attempt)))
}

/// Endpoint and throttling settings
#[derive(Debug, Clone)]
pub struct MarketDataConfig {
    pub quotes_url: String,
    pub historicals_url: String,
    pub fundamentals_url: String,
    /// Requests per minute
    pub rate_limit: usize,
    pub timeout: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            quotes_url: QUOTES_URL.to_string(),
            historicals_url: HISTORICALS_URL.to_string(),
            fundamentals_url: FUNDAMENTALS_URL.to_string(),
            rate_limit: 600,
            timeout: Duration::from_secs(30),
        }
    }
}

impl MarketDataConfig {
    /// Read overrides from `MARKET_DATA_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quotes_url: std::env::var("MARKET_DATA_QUOTES_URL").unwrap_or(defaults.quotes_url),
            historicals_url: std::env::var("MARKET_DATA_HISTORICALS_URL").unwrap_or(defaults.historicals_url),
            fundamentals_url: std::env::var("MARKET_DATA_FUNDAMENTALS_URL").unwrap_or(defaults.fundamentals_url),
            rate_limit: std::env::var("MARKET_DATA_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit),
            timeout: std::env::var("MARKET_DATA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

#[derive(Clone)]
pub struct MarketDataClient {
    config: MarketDataConfig,
    client: Client,
    rate_limiter: RateLimiter,
}

impl MarketDataClient {
    pub fn new(config: MarketDataConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let rate_limiter = RateLimiter::per_minute(config.rate_limit);

        Self {
            config,
            client,
            rate_limiter,
        }
    }

    /// Execute a request through the limiter, retrying on 429
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let Some(req) = request.try_clone() else {
                return Err(AnalysisError::ApiError("request body is not clonable".to_string()));
            };

            self.rate_limiter.acquire().await;
            let response = self
                .client
                .execute(req)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            if attempt >= MAX_ATTEMPTS {
                return Err(AnalysisError::ApiError(format!(
                    "{} still throttled after {} attempts",
                    request.url().path(),
                    attempt
                )));
            }

            let header = response.headers().get(reqwest::header::RETRY_AFTER);
            let delay = retry_delay(header.and_then(|h| h.to_str().ok()), attempt);
            tracing::warn!("Throttled on {}, retrying in {:?}", request.url().path(), delay);
            tokio::time::sleep(delay).await;
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, AnalysisError> {
        let response = self.send_request(builder).await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidData(e.to_string()))
    }
}

#[async_trait]
impl MarketDataProvider for MarketDataClient {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, AnalysisError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        if symbols.len() > MAX_QUOTE_BATCH {
            return Err(AnalysisError::InvalidData(format!(
                "quote batch of {} exceeds limit {}",
                symbols.len(),
                MAX_QUOTE_BATCH
            )));
        }

        let body: QuotesResponse = self
            .get_json(self.client.get(&self.config.quotes_url).query(&[("symbols", symbols.join(","))]))
            .await?;

        let quotes = body
            .results
            .into_iter()
            .flatten()
            .filter_map(|record| match Quote::try_from(record) {
                Ok(quote) => Some(quote),
                Err(e) => {
                    tracing::warn!("Dropping malformed quote: {}", e);
                    None
                }
            })
            .collect();

        Ok(quotes)
    }

    async fn fetch_historical(&self, symbol: &str, span: ChartSpan) -> Result<HistoricalSeries, AnalysisError> {
        let url = format!("{}{}/", self.config.historicals_url, symbol);
        let body: HistoricalsResponse = self
            .get_json(
                self.client
                    .get(&url)
                    .query(&[("interval", span.interval()), ("span", span.as_str())]),
            )
            .await?;

        body.into_series(symbol)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError> {
        let url = format!("{}{}/", self.config.fundamentals_url, symbol);
        let record: FundamentalsRecord = self.get_json(self.client.get(&url)).await?;
        Ok(record.into())
    }

    fn max_quote_batch(&self) -> usize {
        MAX_QUOTE_BATCH
    }
}
