//! Pick Engine Data Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use technical_analysis::Crossover;

/// Sector / industry label used when fundamentals are unavailable
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Round to a fixed number of decimal places for display
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Six normalized factor scores, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub recovery_potential: f64,
    pub momentum: f64,
    pub volume_confirmation: f64,
    pub valuation: f64,
    pub market_cap: f64,
    pub recent_momentum: f64,
}

/// A ranked recovery candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPick {
    /// 1-based, dense, assigned after the final sort
    pub rank: usize,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub previous_close: f64,
    pub change_percent: f64,
    pub change_amount: f64,
    pub high_52_week: f64,
    pub drawdown_percent: f64,
    /// 0 when unknown
    pub market_cap: f64,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub sector: String,
    pub industry: String,
    /// Weighted composite, 0-100
    pub composite_score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub reasoning: String,
    pub sma5: Option<f64>,
    pub sma20: Option<f64>,
    /// Most recent SMA5/SMA20 cross
    pub trend: Crossover,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPicksResult {
    pub picks: Vec<TopPick>,
    pub total_scanned: usize,
    pub total_candidates: usize,
    pub fetched_at: DateTime<Utc>,
}

/// A deep-drawdown candidate with fundamentals attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePick {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub previous_close: f64,
    pub change_percent: f64,
    pub change_amount: f64,
    pub high_52_week: f64,
    pub drawdown_percent: f64,
    pub market_cap: f64,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub sector: String,
    pub industry: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePicksResult {
    pub picks: Vec<ValuePick>,
    pub total_scanned: usize,
    pub total_qualified: usize,
    pub fetched_at: DateTime<Utc>,
}

/// A constituent that gained at least the configured percent today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMove {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub previous_close: f64,
    pub change_percent: f64,
    pub change_amount: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMovers {
    pub key: String,
    pub display_name: String,
    pub stocks: Vec<StockMove>,
    pub total_constituents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoversResult {
    pub indices: Vec<IndexMovers>,
    pub market_open: bool,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSnapshot {
    pub symbol: String,
    pub span: String,
    pub interval: String,
    pub points: Vec<ChartPoint>,
    pub current_price: f64,
    pub previous_close: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub fundamentals: Option<analysis_core::Fundamentals>,
    pub fetched_at: DateTime<Utc>,
}
