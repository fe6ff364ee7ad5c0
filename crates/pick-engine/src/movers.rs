//! Index Movers
//!
//! Per-index list of constituents up at least `min_gain_percent` on the day.
//! Polled often, so it is never cached beyond the constituent lists.

use analysis_core::{Clock, IndexConfig, IndexConstituent, Quote};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::models::{round_to, IndexMovers, MoversResult, StockMove};
use crate::resolver::UniverseResolver;

const REGULAR_OPEN_MINUTES: u32 = 9 * 60 + 30;
const REGULAR_CLOSE_MINUTES: u32 = 16 * 60;

/// US regular session: Mon-Fri, 09:30 to 16:00 New York time
pub fn is_market_open_at(now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&chrono_tz::US::Eastern);

    if local.weekday() == Weekday::Sat || local.weekday() == Weekday::Sun {
        return false;
    }

    let time_minutes = local.hour() * 60 + local.minute();
    (REGULAR_OPEN_MINUTES..REGULAR_CLOSE_MINUTES).contains(&time_minutes)
}

/// Gainers of one index, biggest move first
pub fn build_index_movers(
    index: &IndexConfig,
    constituents: &[IndexConstituent],
    quotes: &HashMap<String, Quote>,
    min_gain_percent: f64,
) -> IndexMovers {
    let mut stocks: Vec<StockMove> = constituents
        .iter()
        .filter_map(|c| {
            let quote = quotes.get(&c.symbol)?;
            let previous_close = quote.previous_close.filter(|p| *p != 0.0)?;
            let change_amount = quote.last_price - previous_close;
            let change_percent = change_amount / previous_close * 100.0;

            if !(change_percent >= min_gain_percent) {
                return None;
            }

            Some(StockMove {
                symbol: c.symbol.clone(),
                name: c.name.clone(),
                price: quote.last_price,
                previous_close,
                change_percent,
                change_amount,
                updated_at: quote.updated_at,
            })
        })
        .collect();

    stocks.sort_by(|a, b| b.change_percent.partial_cmp(&a.change_percent).unwrap_or(Ordering::Equal));
    for s in &mut stocks {
        s.change_percent = round_to(s.change_percent, 2);
        s.change_amount = round_to(s.change_amount, 2);
    }

    IndexMovers {
        key: index.key.clone(),
        display_name: index.display_name.clone(),
        stocks,
        total_constituents: constituents.len(),
    }
}

pub struct MoversPipeline {
    resolver: Arc<UniverseResolver>,
    clock: Arc<dyn Clock>,
    indices: Vec<IndexConfig>,
    min_gain_percent: f64,
}

impl MoversPipeline {
    pub fn new(
        resolver: Arc<UniverseResolver>,
        clock: Arc<dyn Clock>,
        indices: Vec<IndexConfig>,
        min_gain_percent: f64,
    ) -> Self {
        Self {
            resolver,
            clock,
            indices,
            min_gain_percent,
        }
    }

    /// One snapshot across every configured index. A failed index shows up
    /// with no constituents rather than failing the run.
    pub async fn run(&self) -> MoversResult {
        let by_index = self.resolver.resolve_by_index(&self.indices).await;

        let symbols: Vec<String> = by_index
            .iter()
            .flatten()
            .map(|c| c.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let quotes = self.resolver.fetch_batch_quotes(&symbols).await;

        let indices: Vec<IndexMovers> = self
            .indices
            .iter()
            .zip(&by_index)
            .map(|(index, members)| build_index_movers(index, members, &quotes, self.min_gain_percent))
            .collect();

        let movers: usize = indices.iter().map(|i| i.stocks.len()).sum();
        tracing::info!("🚀 {} movers across {} indices", movers, indices.len());

        let now = self.clock.now();
        MoversResult {
            indices,
            market_open: is_market_open_at(now),
            fetched_at: now,
        }
    }
}
