//! Candidate Filter
//!
//! Reduces the universe to a tractable candidate set. Cheap quote checks run
//! first so historicals are only fetched for symbols that can still qualify;
//! the series checks then run on whatever history came back.

use analysis_core::{HistoricalSeries, Quote};

use crate::config::{EngineConfig, MIN_HISTORY_SAMPLES, TOP_PICKS_MIN_DRAWDOWN_PERCENT};

/// Why a symbol was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    NoQuote,
    NoPreviousClose,
    BelowMinPrice,
    NoHistory,
    InsufficientHistory,
    NoHigh,
    ShallowDrawdown,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::NoQuote => "no quote",
            Rejection::NoPreviousClose => "no previous close",
            Rejection::BelowMinPrice => "below minimum price",
            Rejection::NoHistory => "no history",
            Rejection::InsufficientHistory => "insufficient history",
            Rejection::NoHigh => "no 52-week high",
            Rejection::ShallowDrawdown => "drawdown below threshold",
        }
    }
}

/// A symbol that passed the quote checks
#[derive(Debug, Clone, PartialEq)]
pub struct PricedSymbol {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub previous_close: f64,
}

impl PricedSymbol {
    pub fn change_amount(&self) -> f64 {
        self.price - self.previous_close
    }

    pub fn change_percent(&self) -> f64 {
        self.change_amount() / self.previous_close * 100.0
    }
}

/// A symbol that passed every filter. Values are full precision.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub previous_close: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub high_52_week: f64,
    pub drawdown_percent: f64,
    pub series: HistoricalSeries,
}

/// Thresholds for one pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFilter {
    pub min_price: f64,
    pub min_samples: usize,
    pub min_drawdown_percent: f64,
}

impl CandidateFilter {
    /// Any recovery candidate (3% off the high)
    pub fn top_picks(config: &EngineConfig) -> Self {
        Self {
            min_price: config.min_stock_price,
            min_samples: MIN_HISTORY_SAMPLES,
            min_drawdown_percent: TOP_PICKS_MIN_DRAWDOWN_PERCENT,
        }
    }

    /// Deep drawdowns only
    pub fn value_picks(config: &EngineConfig) -> Self {
        Self {
            min_price: config.min_stock_price,
            min_samples: MIN_HISTORY_SAMPLES,
            min_drawdown_percent: config.min_drawdown_percent,
        }
    }

    /// Quote checks: quote present, previous close non-zero, price above the floor
    pub fn screen_quote(&self, symbol: &str, name: &str, quote: Option<&Quote>) -> Result<PricedSymbol, Rejection> {
        let quote = quote.ok_or(Rejection::NoQuote)?;

        let previous_close = match quote.previous_close {
            Some(prev) if prev != 0.0 => prev,
            _ => return Err(Rejection::NoPreviousClose),
        };

        if !(quote.last_price >= self.min_price) {
            return Err(Rejection::BelowMinPrice);
        }

        Ok(PricedSymbol {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price: quote.last_price,
            previous_close,
        })
    }

    /// Series checks: enough history, a positive 52-week high, enough drawdown
    pub fn screen_series(
        &self,
        priced: PricedSymbol,
        series: Option<HistoricalSeries>,
    ) -> Result<Candidate, Rejection> {
        let series = series.ok_or(Rejection::NoHistory)?;
        if series.len() < self.min_samples {
            return Err(Rejection::InsufficientHistory);
        }

        let high_52_week = match series.high_52_week() {
            Some(high) if high > 0.0 => high,
            _ => return Err(Rejection::NoHigh),
        };

        let drawdown_percent = (high_52_week - priced.price) / high_52_week * 100.0;
        if !(drawdown_percent >= self.min_drawdown_percent) {
            return Err(Rejection::ShallowDrawdown);
        }

        Ok(Candidate {
            change_amount: priced.change_amount(),
            change_percent: priced.change_percent(),
            symbol: priced.symbol,
            name: priced.name,
            price: priced.price,
            previous_close: priced.previous_close,
            high_52_week,
            drawdown_percent,
            series,
        })
    }
}
