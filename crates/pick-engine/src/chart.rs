use analysis_core::{AnalysisError, ChartSpan, Clock, MarketDataProvider};

use crate::models::{ChartPoint, ChartSnapshot};

/// Price history plus the current quote and fundamentals for one symbol.
///
/// The three lookups run concurrently. Only a historicals failure fails the
/// call; a missing quote falls back to the last close.
pub async fn chart_snapshot(
    provider: &dyn MarketDataProvider,
    clock: &dyn Clock,
    symbol: &str,
    span: ChartSpan,
) -> Result<ChartSnapshot, AnalysisError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidData("symbol is required".to_string()));
    }

    let symbols = [symbol.clone()];
    let (historical, quotes, fundamentals) = tokio::join!(
        provider.fetch_historical(&symbol, span),
        provider.fetch_quotes(&symbols),
        provider.fetch_fundamentals(&symbol),
    );

    let series = historical?;
    let quote = match quotes {
        Ok(quotes) => quotes.into_iter().find(|q| q.symbol == symbol),
        Err(e) => {
            tracing::warn!("Quote lookup failed for {}: {}", symbol, e);
            None
        }
    };
    let fundamentals = match fundamentals {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::warn!("Fundamentals lookup failed for {}: {}", symbol, e);
            None
        }
    };

    let points: Vec<ChartPoint> = series
        .bars()
        .iter()
        .map(|b| ChartPoint {
            date: b.timestamp,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
        .collect();

    let current_price = match &quote {
        Some(q) => q.last_price,
        None => series.latest().map(|b| b.close).unwrap_or(0.0),
    };
    let previous_close = quote.as_ref().and_then(|q| q.previous_close).unwrap_or(0.0);
    let change_amount = current_price - previous_close;
    let change_percent = if previous_close > 0.0 {
        change_amount / previous_close * 100.0
    } else {
        0.0
    };

    Ok(ChartSnapshot {
        symbol,
        span: span.as_str().to_string(),
        interval: span.interval().to_string(),
        points,
        current_price,
        previous_close,
        change_amount,
        change_percent,
        fundamentals,
        fetched_at: clock.now(),
    })
}
