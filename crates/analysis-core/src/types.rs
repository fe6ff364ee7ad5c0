use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Daily (or weekly) bars for one symbol, strictly ascending by timestamp.
///
/// The last element is the most recent sample. Moving averages and crossover
/// scans index from the end, so the ordering is checked when the series is
/// built rather than assumed downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoricalSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl HistoricalSeries {
    /// Build a series, rejecting out-of-order timestamps and non-finite prices.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        let symbol = symbol.into();

        if let Some(pos) = bars.windows(2).position(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(AnalysisError::InvalidData(format!(
                "{}: bars not in ascending order at index {}",
                symbol,
                pos + 1
            )));
        }

        if let Some(bar) = bars
            .iter()
            .find(|b| !(b.high.is_finite() && b.close.is_finite() && b.volume.is_finite()))
        {
            return Err(AnalysisError::InvalidData(format!(
                "{}: non-finite bar at {}",
                symbol, bar.timestamp
            )));
        }

        Ok(Self { symbol, bars })
    }

    /// Build a series from provider output that may arrive unsorted.
    pub fn from_unsorted(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, AnalysisError> {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self::new(symbol, bars)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Highest `high` in the series; `None` when empty.
    pub fn high_52_week(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.high).reduce(f64::max)
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

/// Current quote for a symbol. Fetched fresh on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last_price: f64,
    /// `None` when the provider sent no usable previous close.
    pub previous_close: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Percent change from the previous close, `None` when it is absent or zero.
    pub fn change_percent(&self) -> Option<f64> {
        match self.previous_close {
            Some(prev) if prev != 0.0 => Some((self.last_price - prev) / prev * 100.0),
            _ => None,
        }
    }
}

/// Company fundamentals. Every field is optional; absence is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub high_52_weeks: Option<f64>,
    pub low_52_weeks: Option<f64>,
}

/// A ticker belonging to an index universe
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexConstituent {
    pub symbol: String,
    pub name: String,
}

/// Encoding of a constituent list source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstituentFormat {
    /// JSON array of `{"Symbol": .., "Name": ..}`
    Json,
    /// Header row followed by `ticker,name...` lines
    Csv,
}

/// Where to find an index's constituents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub key: String,
    pub display_name: String,
    pub source: String,
    pub format: ConstituentFormat,
}

impl IndexConfig {
    pub fn new(key: &str, display_name: &str, source: &str, format: ConstituentFormat) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            source: source.to_string(),
            format,
        }
    }
}

/// Chart / historicals window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartSpan {
    Day,
    Week,
    Month,
    ThreeMonth,
    Year,
    FiveYear,
}

impl ChartSpan {
    /// Parse a span name; unknown names fall back to one year.
    pub fn parse(s: &str) -> Self {
        match s {
            "day" => ChartSpan::Day,
            "week" => ChartSpan::Week,
            "month" => ChartSpan::Month,
            "3month" => ChartSpan::ThreeMonth,
            "5year" => ChartSpan::FiveYear,
            _ => ChartSpan::Year,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartSpan::Day => "day",
            ChartSpan::Week => "week",
            ChartSpan::Month => "month",
            ChartSpan::ThreeMonth => "3month",
            ChartSpan::Year => "year",
            ChartSpan::FiveYear => "5year",
        }
    }

    /// Bar interval the provider uses for this span
    pub fn interval(&self) -> &'static str {
        match self {
            ChartSpan::Day => "5minute",
            ChartSpan::Week => "10minute",
            ChartSpan::Month | ChartSpan::ThreeMonth | ChartSpan::Year => "day",
            ChartSpan::FiveYear => "week",
        }
    }
}
