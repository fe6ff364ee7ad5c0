//! Top-picks and value-picks pipelines
//!
//! Phases run strictly in order: constituents, quotes, quote filter,
//! historicals, series filter, (prelim score), fundamentals, final ranking.
//! Each phase fans out in bounded batches and only feeds its survivors to
//! the next one.

use analysis_core::{
    AnalysisError, ChartSpan, Clock, ConstituentSource, Fundamentals, HistoricalSeries, IndexConfig,
    MarketDataProvider,
};
use chrono::Duration;
use futures_util::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::config::EngineConfig;
use crate::filter::{Candidate, CandidateFilter, PricedSymbol, Rejection};
use crate::models::{round_to, ScoreBreakdown, TopPick, TopPicksResult, ValuePick, ValuePicksResult, UNKNOWN_LABEL};
use crate::reasoning::generate_reasoning;
use crate::resolver::{Universe, UniverseResolver};
use crate::scoring::{
    composite_score, preliminary_score, score_volume, technical_breakdown, with_fundamentals, TechnicalInputs,
    TrendSignals,
};

/// Span of history used for the 52-week high and the moving averages
const SCAN_SPAN: ChartSpan = ChartSpan::Year;

/// Candidate with its cheap factors computed
struct Prescored {
    candidate: Candidate,
    trend: TrendSignals,
    technical: ScoreBreakdown,
    prelim: f64,
}

pub struct PickEngine {
    resolver: Arc<UniverseResolver>,
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    indices: Vec<IndexConfig>,
    top_picks_cache: ResultCache<TopPicksResult>,
    value_picks_cache: ResultCache<ValuePicksResult>,
}

impl PickEngine {
    pub fn new(
        config: EngineConfig,
        indices: Vec<IndexConfig>,
        provider: Arc<dyn MarketDataProvider>,
        source: Arc<dyn ConstituentSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = Arc::new(UniverseResolver::new(
            source,
            provider.clone(),
            clock.clone(),
            Duration::seconds(config.constituents_cache_ttl_secs),
            config.quote_batch_size,
        ));
        let picks_ttl = Duration::seconds(config.picks_cache_ttl_secs);

        Self {
            resolver,
            provider,
            top_picks_cache: ResultCache::new(picks_ttl, clock.clone()),
            value_picks_cache: ResultCache::new(picks_ttl, clock.clone()),
            clock,
            config,
            indices,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn indices(&self) -> &[IndexConfig] {
        &self.indices
    }

    /// Shared resolver, so other pipelines reuse the constituent cache
    pub fn resolver(&self) -> Arc<UniverseResolver> {
        self.resolver.clone()
    }

    pub fn provider(&self) -> Arc<dyn MarketDataProvider> {
        self.provider.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Cached top picks, recomputed once the cache entry has expired
    pub async fn top_picks(&self) -> Result<TopPicksResult, AnalysisError> {
        self.top_picks_cache.get_or_refresh(|| self.compute_top_picks()).await
    }

    /// Cached value picks, recomputed once the cache entry has expired
    pub async fn value_picks(&self) -> Result<ValuePicksResult, AnalysisError> {
        self.value_picks_cache.get_or_refresh(|| self.compute_value_picks()).await
    }

    /// Like `top_picks`, but serves an expired entry when the refresh fails
    pub async fn top_picks_or_stale(&self) -> Result<TopPicksResult, AnalysisError> {
        match self.top_picks().await {
            Ok(result) => Ok(result),
            Err(e) => match self.top_picks_cache.peek().await {
                Some(entry) => {
                    tracing::warn!("Top picks refresh failed, serving result from {}: {}", entry.fetched_at, e);
                    Ok(entry.data)
                }
                None => Err(e),
            },
        }
    }

    /// Like `value_picks`, but serves an expired entry when the refresh fails
    pub async fn value_picks_or_stale(&self) -> Result<ValuePicksResult, AnalysisError> {
        match self.value_picks().await {
            Ok(result) => Ok(result),
            Err(e) => match self.value_picks_cache.peek().await {
                Some(entry) => {
                    tracing::warn!("Value picks refresh failed, serving result from {}: {}", entry.fetched_at, e);
                    Ok(entry.data)
                }
                None => Err(e),
            },
        }
    }

    /// Full top-picks run, bypassing the cache
    pub async fn compute_top_picks(&self) -> Result<TopPicksResult, AnalysisError> {
        tracing::info!("📊 Computing top picks");
        let filter = CandidateFilter::top_picks(&self.config);
        let (universe, candidates) = self.screen_universe(&filter).await?;
        let total_candidates = candidates.len();

        let mut prescored: Vec<Prescored> = candidates.into_iter().map(prescore).collect();
        prescored.sort_by(|a, b| b.prelim.partial_cmp(&a.prelim).unwrap_or(Ordering::Equal));
        prescored.truncate(self.config.prelim_pool_size);

        let symbols: Vec<&str> = prescored.iter().map(|p| p.candidate.symbol.as_str()).collect();
        let fundamentals = self.fetch_fundamentals(&symbols).await;

        let mut scored: Vec<(f64, TopPick)> = prescored
            .into_iter()
            .zip(fundamentals)
            .map(|(p, f)| final_score(p, f.as_ref()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(self.config.top_picks_count);

        let picks: Vec<TopPick> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (_, pick))| TopPick { rank: i + 1, ..pick })
            .collect();

        tracing::info!(
            "✅ Top picks ready: {} picks from {} candidates ({} scanned)",
            picks.len(),
            total_candidates,
            universe.len()
        );

        Ok(TopPicksResult {
            picks,
            total_scanned: universe.len(),
            total_candidates,
            fetched_at: self.clock.now(),
        })
    }

    /// Full value-picks run, bypassing the cache
    pub async fn compute_value_picks(&self) -> Result<ValuePicksResult, AnalysisError> {
        tracing::info!("📊 Computing value picks");
        let filter = CandidateFilter::value_picks(&self.config);
        let (universe, mut candidates) = self.screen_universe(&filter).await?;
        let total_qualified = candidates.len();

        candidates.sort_by(|a, b| {
            b.drawdown_percent
                .partial_cmp(&a.drawdown_percent)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(self.config.value_fundamentals_limit);

        let symbols: Vec<&str> = candidates.iter().map(|c| c.symbol.as_str()).collect();
        let fundamentals = self.fetch_fundamentals(&symbols).await;

        let picks: Vec<ValuePick> = candidates
            .into_iter()
            .zip(fundamentals)
            .map(|(c, f)| value_pick(c, f.as_ref()))
            .collect();

        tracing::info!(
            "✅ Value picks ready: {} picks, {} qualified ({} scanned)",
            picks.len(),
            total_qualified,
            universe.len()
        );

        Ok(ValuePicksResult {
            picks,
            total_scanned: universe.len(),
            total_qualified,
            fetched_at: self.clock.now(),
        })
    }

    /// Constituents, quotes and both filter stages. Candidates keep universe order.
    async fn screen_universe(&self, filter: &CandidateFilter) -> Result<(Universe, Vec<Candidate>), AnalysisError> {
        let universe = self.resolver.resolve_universe(&self.indices).await?;
        let quotes = self.resolver.require_quotes(&universe.symbols).await?;

        let mut rejections: HashMap<Rejection, usize> = HashMap::new();
        let mut priced: Vec<PricedSymbol> = Vec::new();
        for symbol in &universe.symbols {
            match filter.screen_quote(symbol, universe.name_of(symbol), quotes.get(symbol)) {
                Ok(p) => priced.push(p),
                Err(r) => *rejections.entry(r).or_default() += 1,
            }
        }

        tracing::info!("{} of {} symbols passed quote checks", priced.len(), universe.len());

        let mut candidates = Vec::new();
        for batch in priced.chunks(self.config.historical_batch_size) {
            let results = join_all(
                batch
                    .iter()
                    .map(|p| self.provider.fetch_historical(&p.symbol, SCAN_SPAN)),
            )
            .await;

            for (priced, result) in batch.iter().zip(results) {
                let series = absent_on_error(&priced.symbol, "historicals", result);
                match filter.screen_series(priced.clone(), series) {
                    Ok(candidate) => candidates.push(candidate),
                    Err(r) => *rejections.entry(r).or_default() += 1,
                }
            }
        }

        for (reason, count) in &rejections {
            tracing::debug!("Rejected {} symbols: {}", count, reason.as_str());
        }
        tracing::info!("{} candidates after history checks", candidates.len());

        Ok((universe, candidates))
    }

    /// Fundamentals per symbol, in order. Failed lookups come back as `None`.
    async fn fetch_fundamentals(&self, symbols: &[&str]) -> Vec<Option<Fundamentals>> {
        let mut out = Vec::with_capacity(symbols.len());
        for batch in symbols.chunks(self.config.historical_batch_size) {
            let results = join_all(batch.iter().map(|s| self.provider.fetch_fundamentals(s))).await;
            out.extend(
                batch
                    .iter()
                    .zip(results)
                    .map(|(symbol, result)| absent_on_error(symbol, "fundamentals", result)),
            );
        }

        let found = out.iter().filter(|f| f.is_some()).count();
        tracing::info!("Fundamentals enriched for {} of {} symbols", found, symbols.len());
        out
    }
}

fn absent_on_error<T>(symbol: &str, what: &str, result: Result<T, AnalysisError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to fetch {} for {}: {}", what, symbol, e);
            None
        }
    }
}

fn volume_score(series: &HistoricalSeries) -> f64 {
    score_volume(&series.volumes())
}

fn prescore(candidate: Candidate) -> Prescored {
    let trend = TrendSignals::from_series(&candidate.series);
    let technical = technical_breakdown(&TechnicalInputs {
        price: candidate.price,
        drawdown_percent: candidate.drawdown_percent,
        change_percent: candidate.change_percent,
        volume_score: volume_score(&candidate.series),
        trend,
    });

    Prescored {
        prelim: preliminary_score(&technical),
        candidate,
        trend,
        technical,
    }
}

/// Six-factor score plus the display record. Returns the unrounded composite
/// alongside so ranking does not depend on display rounding.
fn final_score(p: Prescored, fundamentals: Option<&Fundamentals>) -> (f64, TopPick) {
    let breakdown = with_fundamentals(p.technical, fundamentals);
    let composite = composite_score(&breakdown);
    let pe_ratio = fundamentals.and_then(|f| f.pe_ratio);
    let c = p.candidate;

    let pick = TopPick {
        rank: 0,
        reasoning: generate_reasoning(&breakdown, c.drawdown_percent, pe_ratio),
        price: c.price,
        previous_close: c.previous_close,
        change_percent: round_to(c.change_percent, 2),
        change_amount: round_to(c.change_amount, 2),
        high_52_week: c.high_52_week,
        drawdown_percent: round_to(c.drawdown_percent, 2),
        market_cap: fundamentals.and_then(|f| f.market_cap).unwrap_or(0.0),
        pe_ratio,
        dividend_yield: fundamentals.and_then(|f| f.dividend_yield),
        sector: label(fundamentals.and_then(|f| f.sector.as_deref())),
        industry: label(fundamentals.and_then(|f| f.industry.as_deref())),
        composite_score: round_to(composite, 1),
        score_breakdown: breakdown,
        sma5: p.trend.sma5.map(|v| round_to(v, 2)),
        sma20: p.trend.sma20.map(|v| round_to(v, 2)),
        trend: p.trend.crossover,
        symbol: c.symbol,
        name: c.name,
    };

    (composite, pick)
}

fn value_pick(c: Candidate, fundamentals: Option<&Fundamentals>) -> ValuePick {
    ValuePick {
        price: c.price,
        previous_close: c.previous_close,
        change_percent: round_to(c.change_percent, 2),
        change_amount: round_to(c.change_amount, 2),
        high_52_week: c.high_52_week,
        drawdown_percent: round_to(c.drawdown_percent, 2),
        market_cap: fundamentals.and_then(|f| f.market_cap).unwrap_or(0.0),
        pe_ratio: fundamentals.and_then(|f| f.pe_ratio),
        dividend_yield: fundamentals.and_then(|f| f.dividend_yield),
        sector: label(fundamentals.and_then(|f| f.sector.as_deref())),
        industry: label(fundamentals.and_then(|f| f.industry.as_deref())),
        description: fundamentals
            .and_then(|f| f.description.clone())
            .unwrap_or_default(),
        symbol: c.symbol,
        name: c.name,
    }
}

fn label(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}
