//! Provider response structures and their conversion into domain types.
//!
//! The provider sends most numbers as strings and uses `null` liberally, so
//! every field is optional here and converted explicitly. Records that cannot
//! be turned into a usable domain value are rejected with `InvalidData`.

use analysis_core::{AnalysisError, Bar, Fundamentals, HistoricalSeries, Quote};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Parse a provider decimal string. Empty, missing or non-finite values are absent.
pub fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// Quotes
#[derive(Debug, Deserialize)]
pub struct QuotesResponse {
    #[serde(default)]
    pub results: Vec<Option<QuoteRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRecord {
    pub symbol: String,
    #[serde(default)]
    pub last_trade_price: Option<String>,
    #[serde(default)]
    pub previous_close: Option<String>,
    #[serde(default)]
    pub adjusted_previous_close: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TryFrom<QuoteRecord> for Quote {
    type Error = AnalysisError;

    fn try_from(record: QuoteRecord) -> Result<Self, Self::Error> {
        let last_price = parse_decimal(record.last_trade_price.as_deref()).ok_or_else(|| {
            AnalysisError::InvalidData(format!("{}: unparseable last_trade_price", record.symbol))
        })?;

        // Adjusted close wins when the provider sends a non-empty one
        let previous_close = parse_decimal(record.adjusted_previous_close.as_deref())
            .or_else(|| parse_decimal(record.previous_close.as_deref()));

        Ok(Quote {
            symbol: record.symbol,
            last_price,
            previous_close,
            updated_at: parse_timestamp(record.updated_at.as_deref()),
        })
    }
}

// Historicals
#[derive(Debug, Deserialize)]
pub struct HistoricalsResponse {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub historicals: Vec<HistoricalRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalRecord {
    pub begins_at: String,
    #[serde(default)]
    pub open_price: Option<String>,
    #[serde(default)]
    pub close_price: Option<String>,
    #[serde(default)]
    pub high_price: Option<String>,
    #[serde(default)]
    pub low_price: Option<String>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl HistoricalsResponse {
    /// Convert into a validated series. Bars with an unparseable timestamp,
    /// close or high are dropped; the remainder must be strictly ascending.
    pub fn into_series(self, symbol: &str) -> Result<HistoricalSeries, AnalysisError> {
        let total = self.historicals.len();
        let bars: Vec<Bar> = self
            .historicals
            .into_iter()
            .filter_map(|h| {
                let timestamp = parse_timestamp(Some(h.begins_at.as_str()))?;
                let close = parse_decimal(h.close_price.as_deref())?;
                let high = parse_decimal(h.high_price.as_deref())?;
                Some(Bar {
                    timestamp,
                    open: parse_decimal(h.open_price.as_deref()).unwrap_or(close),
                    high,
                    low: parse_decimal(h.low_price.as_deref()).unwrap_or(close),
                    close,
                    volume: h.volume.filter(|v| v.is_finite()).unwrap_or(0.0),
                })
            })
            .collect();

        if bars.len() < total {
            tracing::debug!("{}: dropped {} malformed bars", symbol, total - bars.len());
        }

        HistoricalSeries::new(symbol, bars)
    }
}

// Fundamentals
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FundamentalsRecord {
    #[serde(default)]
    pub market_cap: Option<String>,
    #[serde(default)]
    pub pe_ratio: Option<String>,
    #[serde(default)]
    pub dividend_yield: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub high_52_weeks: Option<String>,
    #[serde(default)]
    pub low_52_weeks: Option<String>,
}

impl From<FundamentalsRecord> for Fundamentals {
    fn from(r: FundamentalsRecord) -> Self {
        Fundamentals {
            market_cap: parse_decimal(r.market_cap.as_deref()),
            pe_ratio: parse_decimal(r.pe_ratio.as_deref()),
            dividend_yield: parse_decimal(r.dividend_yield.as_deref()),
            sector: non_empty(r.sector),
            industry: non_empty(r.industry),
            description: non_empty(r.description),
            high_52_weeks: parse_decimal(r.high_52_weeks.as_deref()),
            low_52_weeks: parse_decimal(r.low_52_weeks.as_deref()),
        }
    }
}
