//! Universe / Quote Resolver
//!
//! Resolves index constituents through a long-lived cache and fetches quotes
//! in provider-sized batches. Per-index and per-batch failures only remove
//! their own symbols from the result.

use analysis_core::{AnalysisError, Clock, ConstituentSource, IndexConfig, IndexConstituent, MarketDataProvider, Quote};
use chrono::Duration;
use dashmap::DashMap;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::CacheEntry;

/// Deduplicated symbol universe in resolution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    pub symbols: Vec<String>,
    names: HashMap<String, String>,
}

impl Universe {
    /// Union of the given lists. The first occurrence of a symbol wins.
    pub fn from_lists<'a>(lists: impl IntoIterator<Item = &'a [IndexConstituent]>) -> Self {
        let mut universe = Self::default();
        for list in lists {
            for c in list {
                if universe.names.contains_key(&c.symbol) {
                    continue;
                }
                universe.names.insert(c.symbol.clone(), c.name.clone());
                universe.symbols.push(c.symbol.clone());
            }
        }
        universe
    }

    /// Constituent name, falling back to the ticker itself
    pub fn name_of<'a>(&'a self, symbol: &'a str) -> &'a str {
        match self.names.get(symbol) {
            Some(name) if !name.is_empty() => name.as_str(),
            _ => symbol,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

pub struct UniverseResolver {
    source: Arc<dyn ConstituentSource>,
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    cache: DashMap<String, CacheEntry<Vec<IndexConstituent>>>,
    constituents_ttl: Duration,
    quote_batch_size: usize,
}

impl UniverseResolver {
    pub fn new(
        source: Arc<dyn ConstituentSource>,
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
        constituents_ttl: Duration,
        quote_batch_size: usize,
    ) -> Self {
        Self {
            source,
            provider,
            clock,
            cache: DashMap::new(),
            constituents_ttl,
            quote_batch_size,
        }
    }

    /// Constituents of one index, served from cache while younger than the TTL.
    /// Failures are returned to the caller and never cached.
    pub async fn fetch_constituents(&self, index: &IndexConfig) -> Result<Vec<IndexConstituent>, AnalysisError> {
        let now = self.clock.now();
        if let Some(entry) = self.cache.get(&index.key) {
            if entry.is_fresh(now, self.constituents_ttl) {
                tracing::debug!("Constituent cache hit for {}", index.key);
                return Ok(entry.data.clone());
            }
        }

        let members: Vec<IndexConstituent> = self
            .source
            .fetch_constituents(index)
            .await?
            .into_iter()
            .filter(|c| !c.symbol.is_empty())
            .collect();

        tracing::info!("Fetched {} constituents for {}", members.len(), index.display_name);
        self.cache
            .insert(index.key.clone(), CacheEntry::new(members.clone(), self.clock.now()));
        Ok(members)
    }

    /// Constituents per configured index, in configuration order. A failed
    /// index comes back as an empty list.
    pub async fn resolve_by_index(&self, indices: &[IndexConfig]) -> Vec<Vec<IndexConstituent>> {
        let results = join_all(indices.iter().map(|index| self.fetch_constituents(index))).await;

        indices
            .iter()
            .zip(results)
            .map(|(index, result)| match result {
                Ok(members) => members,
                Err(e) => {
                    tracing::warn!("Failed to fetch constituents for {}: {}", index.key, e);
                    Vec::new()
                }
            })
            .collect()
    }

    /// Union of every index's constituents. Errors only when nothing resolved.
    pub async fn resolve_universe(&self, indices: &[IndexConfig]) -> Result<Universe, AnalysisError> {
        let lists = self.resolve_by_index(indices).await;
        let universe = Universe::from_lists(lists.iter().map(|l| l.as_slice()));

        if universe.is_empty() {
            return Err(AnalysisError::UniverseUnavailable(format!(
                "no constituents resolved from {} indices",
                indices.len()
            )));
        }

        tracing::info!("Resolved universe of {} symbols", universe.len());
        Ok(universe)
    }

    fn batch_size(&self) -> usize {
        self.quote_batch_size.min(self.provider.max_quote_batch()).max(1)
    }

    /// Quotes keyed by symbol. Failed batches leave their symbols absent.
    pub async fn fetch_batch_quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut quotes = HashMap::new();
        if symbols.is_empty() {
            return quotes;
        }

        let batches: Vec<&[String]> = symbols.chunks(self.batch_size()).collect();
        let results = join_all(batches.iter().map(|batch| self.provider.fetch_quotes(batch))).await;

        for (batch, result) in batches.iter().zip(results) {
            match result {
                Ok(batch_quotes) => {
                    let requested: HashSet<&str> = batch.iter().map(|s| s.as_str()).collect();
                    for q in batch_quotes {
                        if requested.contains(q.symbol.as_str()) {
                            quotes.insert(q.symbol.clone(), q);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Quote batch of {} symbols failed: {}", batch.len(), e);
                }
            }
        }

        tracing::info!("Fetched {} quotes for {} symbols", quotes.len(), symbols.len());
        quotes
    }

    /// Batch quotes, failing only when symbols were requested and none came back
    pub async fn require_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>, AnalysisError> {
        let quotes = self.fetch_batch_quotes(symbols).await;
        if quotes.is_empty() && !symbols.is_empty() {
            return Err(AnalysisError::QuotesUnavailable(format!(
                "no quotes returned for {} symbols",
                symbols.len()
            )));
        }
        Ok(quotes)
    }
}
