use analysis_core::{AnalysisError, Fundamentals};
use chrono::Duration;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::pipeline::PickEngine;
use crate::testing::{constituent, flat_series, json_index, quote, ManualClock, MockConstituents, MockMarketData};

struct Harness {
    engine: PickEngine,
    provider: Arc<MockMarketData>,
    source: Arc<MockConstituents>,
    clock: Arc<ManualClock>,
}

fn harness(provider: MockMarketData, symbols: &[&str], config: EngineConfig) -> Harness {
    let members = symbols.iter().map(|s| constituent(s, &format!("{} Corp", s))).collect();
    let source = Arc::new(MockConstituents::default().with_index("sp500", members));
    let provider = Arc::new(provider);
    let clock = Arc::new(ManualClock::default());

    let engine = PickEngine::new(
        config,
        vec![json_index("sp500")],
        provider.clone(),
        source.clone(),
        clock.clone(),
    );

    Harness {
        engine,
        provider,
        source,
        clock,
    }
}

/// 60 flat bars at `high`, quoted at `price` with no change on the day
fn stock(provider: MockMarketData, symbol: &str, high: f64, price: f64, fundamentals: Option<Fundamentals>) -> MockMarketData {
    provider.with_stock(quote(symbol, price, Some(price)), flat_series(symbol, 60, high), fundamentals)
}

fn blue_chip() -> Fundamentals {
    Fundamentals {
        pe_ratio: Some(10.0),
        market_cap: Some(1e12),
        sector: Some("Technology".into()),
        industry: Some("Software".into()),
        description: Some("Makes software.".into()),
        ..Fundamentals::default()
    }
}

fn top_picks_market() -> MockMarketData {
    let provider = MockMarketData::default();
    let provider = stock(provider, "S1", 100.0, 60.0, None);
    let provider = stock(provider, "S2", 100.0, 80.0, None);
    let provider = stock(provider, "S3", 100.0, 90.0, Some(blue_chip()));
    let provider = stock(provider, "S4", 100.0, 95.0, None);
    let mut provider = stock(provider, "S5", 100.0, 100.0, None);

    provider.quotes.insert("PENNY".into(), quote("PENNY", 5.0, Some(5.0)));
    provider.series.insert("PENNY".into(), flat_series("PENNY", 60, 9.0));
    provider
}

const TOP_UNIVERSE: [&str; 7] = ["S1", "S2", "S3", "S4", "S5", "PENNY", "NOQUOTE"];

#[tokio::test]
async fn test_top_picks_two_phase_ranking() {
    let config = EngineConfig {
        prelim_pool_size: 3,
        ..EngineConfig::default()
    };
    let h = harness(top_picks_market(), &TOP_UNIVERSE, config);

    let result = h.engine.top_picks().await.unwrap();

    assert_eq!(result.total_scanned, 7);
    assert_eq!(result.total_candidates, 4);

    // S4 has the weakest prelim score and never reaches the fundamentals phase
    assert_eq!(h.provider.fundamentals_calls(), vec!["S1", "S2", "S3"]);

    // Fundamentals lift S3 above S2
    let symbols: Vec<&str> = result.picks.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["S1", "S3", "S2"]);
    let ranks: Vec<usize> = result.picks.iter().map(|p| p.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    let s1 = &result.picks[0];
    assert_eq!(s1.composite_score, 41.3);
    assert_eq!(s1.drawdown_percent, 40.0);
    assert_eq!(s1.sector, "Unknown");
    assert_eq!(s1.market_cap, 0.0);
    assert_eq!(s1.name, "S1 Corp");
    assert_eq!(s1.reasoning, "40% below 52-week high");

    let s3 = &result.picks[1];
    assert_eq!(s3.composite_score, 40.8);
    assert_eq!(s3.sector, "Technology");
    assert_eq!(s3.reasoning, "Attractive P/E of 10.0, large-cap stability");
}

#[tokio::test]
async fn test_top_picks_truncated_to_count() {
    let config = EngineConfig {
        top_picks_count: 2,
        ..EngineConfig::default()
    };
    let h = harness(top_picks_market(), &TOP_UNIVERSE, config);

    let result = h.engine.top_picks().await.unwrap();

    assert_eq!(result.picks.len(), 2);
    assert_eq!(result.total_candidates, 4);
    assert!(result.picks[0].composite_score >= result.picks[1].composite_score);
    for pick in &result.picks {
        assert!((0.0..=100.0).contains(&pick.composite_score));
    }
}

#[tokio::test]
async fn test_historicals_only_for_quote_survivors() {
    let h = harness(top_picks_market(), &TOP_UNIVERSE, EngineConfig::default());

    h.engine.top_picks().await.unwrap();

    let mut fetched = h.provider.historical_calls();
    fetched.sort();
    assert_eq!(fetched, vec!["S1", "S2", "S3", "S4", "S5"]);
}

#[tokio::test]
async fn test_zero_previous_close_excluded() {
    let provider = stock(MockMarketData::default(), "OK", 100.0, 50.0, None)
        .with_stock(quote("ZERO", 50.0, Some(0.0)), flat_series("ZERO", 60, 100.0), None);
    let h = harness(provider, &["OK", "ZERO"], EngineConfig::default());

    let result = h.engine.top_picks().await.unwrap();

    assert_eq!(result.total_candidates, 1);
    assert_eq!(result.picks[0].symbol, "OK");
    assert!(!h.provider.historical_calls().contains(&"ZERO".to_string()));
}

#[tokio::test]
async fn test_failed_history_is_isolated() {
    let mut provider = stock(MockMarketData::default(), "GOOD", 100.0, 70.0, None);
    provider.quotes.insert("NOHIST".into(), quote("NOHIST", 70.0, Some(70.0)));
    let h = harness(provider, &["NOHIST", "GOOD"], EngineConfig::default());

    let result = h.engine.top_picks().await.unwrap();

    assert_eq!(result.total_candidates, 1);
    assert_eq!(result.picks[0].symbol, "GOOD");
}

#[tokio::test]
async fn test_cache_hit_within_ttl_and_refresh_after() {
    let h = harness(top_picks_market(), &TOP_UNIVERSE, EngineConfig::default());

    let first = h.engine.top_picks().await.unwrap();
    h.clock.advance(Duration::minutes(30));
    let second = h.engine.top_picks().await.unwrap();

    assert_eq!(first.fetched_at, second.fetched_at);
    assert_eq!(first, second);
    assert_eq!(h.provider.quote_batches().len(), 1);

    h.clock.advance(Duration::minutes(31));
    let third = h.engine.top_picks().await.unwrap();

    assert!(third.fetched_at > first.fetched_at);
    assert_eq!(h.provider.quote_batches().len(), 2);
    // Constituent lists live for a day
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn test_quote_outage_fails_cold_cache() {
    let h = harness(top_picks_market(), &TOP_UNIVERSE, EngineConfig::default());
    h.provider.set_quote_outage(true);

    let result = h.engine.top_picks().await;
    assert!(matches!(result, Err(AnalysisError::QuotesUnavailable(_))));

    let result = h.engine.top_picks_or_stale().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_failed_refresh_keeps_stale_result() {
    let h = harness(top_picks_market(), &TOP_UNIVERSE, EngineConfig::default());

    let first = h.engine.top_picks().await.unwrap();
    h.clock.advance(Duration::hours(2));
    h.provider.set_quote_outage(true);

    assert!(h.engine.top_picks().await.is_err());

    let stale = h.engine.top_picks_or_stale().await.unwrap();
    assert_eq!(stale.fetched_at, first.fetched_at);

    // Outage over: the next call recomputes
    h.provider.set_quote_outage(false);
    let fresh = h.engine.top_picks().await.unwrap();
    assert!(fresh.fetched_at > first.fetched_at);
}

#[tokio::test]
async fn test_constituent_outage_is_universe_unavailable() {
    let h = harness(top_picks_market(), &TOP_UNIVERSE, EngineConfig::default());
    h.source.set_outage(true);

    let result = h.engine.value_picks().await;
    assert!(matches!(result, Err(AnalysisError::UniverseUnavailable(_))));
}

fn value_market() -> MockMarketData {
    let provider = MockMarketData::default();
    let provider = stock(provider, "A", 100.0, 70.0, Some(blue_chip()));
    let provider = stock(provider, "B", 100.0, 50.0, None);
    let provider = stock(provider, "C", 100.0, 70.0, None);
    let provider = stock(provider, "D", 100.0, 75.0, None);
    // 10% off the high: a top-picks candidate but too shallow for value picks
    stock(provider, "E", 100.0, 90.0, None)
}

#[tokio::test]
async fn test_value_picks_sorted_by_drawdown_with_stable_ties() {
    let h = harness(value_market(), &["A", "B", "C", "D", "E"], EngineConfig::default());

    let result = h.engine.value_picks().await.unwrap();

    let symbols: Vec<&str> = result.picks.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["B", "A", "C", "D"]);
    assert_eq!(result.total_scanned, 5);
    assert_eq!(result.total_qualified, 4);

    for pair in result.picks.windows(2) {
        assert!(pair[0].drawdown_percent >= pair[1].drawdown_percent);
    }

    // Repeat runs give the same order
    let again = h.engine.compute_value_picks().await.unwrap();
    let again: Vec<&str> = again.picks.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(again, symbols);
}

#[tokio::test]
async fn test_value_picks_fundamentals_limit_and_defaults() {
    let config = EngineConfig {
        value_fundamentals_limit: 2,
        ..EngineConfig::default()
    };
    let h = harness(value_market(), &["A", "B", "C", "D", "E"], config);

    let result = h.engine.value_picks().await.unwrap();

    assert_eq!(h.provider.fundamentals_calls(), vec!["B", "A"]);
    assert_eq!(result.picks.len(), 2);
    assert_eq!(result.total_qualified, 4);

    let b = &result.picks[0];
    assert_eq!(b.sector, "Unknown");
    assert_eq!(b.industry, "Unknown");
    assert_eq!(b.market_cap, 0.0);
    assert_eq!(b.description, "");
    assert_eq!(b.drawdown_percent, 50.0);

    let a = &result.picks[1];
    assert_eq!(a.sector, "Technology");
    assert_eq!(a.pe_ratio, Some(10.0));
    assert_eq!(a.description, "Makes software.");
}

#[tokio::test]
async fn test_pipelines_cache_independently() {
    let h = harness(value_market(), &["A", "B", "C", "D", "E"], EngineConfig::default());

    h.engine.value_picks().await.unwrap();
    h.engine.top_picks().await.unwrap();
    h.engine.value_picks().await.unwrap();

    // One quote fetch per pipeline
    assert_eq!(h.provider.quote_batches().len(), 2);
}
