//! Pick Engine
//!
//! Turns index constituents, quotes, price history and fundamentals into
//! ranked recovery candidates ("top picks") and deep-drawdown lists
//! ("value picks"), plus the lighter index-movers and chart views.

pub mod cache;
pub mod chart;
pub mod config;
pub mod filter;
pub mod models;
pub mod movers;
pub mod pipeline;
pub mod reasoning;
pub mod resolver;
pub mod scoring;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use cache::{CacheEntry, ResultCache};
pub use chart::chart_snapshot;
pub use config::EngineConfig;
pub use filter::{Candidate, CandidateFilter, Rejection};
pub use models::{
    ChartPoint, ChartSnapshot, IndexMovers, MoversResult, ScoreBreakdown, StockMove, TopPick, TopPicksResult,
    ValuePick, ValuePicksResult,
};
pub use movers::{build_index_movers, is_market_open_at, MoversPipeline};
pub use pipeline::PickEngine;
pub use reasoning::generate_reasoning;
pub use resolver::{Universe, UniverseResolver};
pub use scoring::{composite_score, preliminary_score, COMPOSITE_WEIGHTS};
