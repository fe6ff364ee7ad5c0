use analysis_core::AnalysisError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Drawdown a top-picks candidate needs before it has any recovery room
pub const TOP_PICKS_MIN_DRAWDOWN_PERCENT: f64 = 3.0;

/// Bars needed for a 20-period SMA
pub const MIN_HISTORY_SAMPLES: usize = 20;

/// Largest symbol list the quotes endpoint accepts in one request
pub const PROVIDER_QUOTE_LIMIT: usize = 1630;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // Candidate thresholds
    pub min_stock_price: f64,              // 10
    pub min_drawdown_percent: f64,         // 20 (value picks)
    pub min_gain_percent: f64,             // 3 (index movers)

    // Output sizes
    pub top_picks_count: usize,            // 10
    pub prelim_pool_size: usize,           // 100 fundamentals lookups for top picks
    pub value_fundamentals_limit: usize,   // 50 fundamentals lookups for value picks

    // Provider batching
    pub historical_batch_size: usize,      // 50
    pub quote_batch_size: usize,           // 1600

    // Cache lifetimes
    pub picks_cache_ttl_secs: i64,         // 1 hour
    pub constituents_cache_ttl_secs: i64,  // 24 hours
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_stock_price: 10.0,
            min_drawdown_percent: 20.0,
            min_gain_percent: 3.0,
            top_picks_count: 10,
            prelim_pool_size: 100,
            value_fundamentals_limit: 50,
            historical_batch_size: 50,
            quote_batch_size: 1600,
            picks_cache_ttl_secs: 60 * 60,
            constituents_cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let config = Self {
            min_stock_price: env_or("MIN_STOCK_PRICE", d.min_stock_price)?,
            min_drawdown_percent: env_or("MIN_DRAWDOWN_PERCENT", d.min_drawdown_percent)?,
            min_gain_percent: env_or("MIN_GAIN_PERCENT", d.min_gain_percent)?,
            top_picks_count: env_or("TOP_PICKS_COUNT", d.top_picks_count)?,
            prelim_pool_size: env_or("PRELIM_POOL_SIZE", d.prelim_pool_size)?,
            value_fundamentals_limit: env_or("VALUE_FUNDAMENTALS_LIMIT", d.value_fundamentals_limit)?,
            historical_batch_size: env_or("HISTORICAL_BATCH_SIZE", d.historical_batch_size)?,
            quote_batch_size: env_or("QUOTE_BATCH_SIZE", d.quote_batch_size)?,
            picks_cache_ttl_secs: env_or("PICKS_CACHE_TTL_SECS", d.picks_cache_ttl_secs)?,
            constituents_cache_ttl_secs: env_or("CONSTITUENTS_CACHE_TTL_SECS", d.constituents_cache_ttl_secs)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let sizes = [
            ("TOP_PICKS_COUNT", self.top_picks_count),
            ("PRELIM_POOL_SIZE", self.prelim_pool_size),
            ("VALUE_FUNDAMENTALS_LIMIT", self.value_fundamentals_limit),
            ("HISTORICAL_BATCH_SIZE", self.historical_batch_size),
            ("QUOTE_BATCH_SIZE", self.quote_batch_size),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(AnalysisError::ConfigError(format!("{} must be greater than 0", name)));
        }

        if self.quote_batch_size > PROVIDER_QUOTE_LIMIT {
            return Err(AnalysisError::ConfigError(format!(
                "QUOTE_BATCH_SIZE {} exceeds provider limit {}",
                self.quote_batch_size, PROVIDER_QUOTE_LIMIT
            )));
        }

        let thresholds = [
            ("MIN_STOCK_PRICE", self.min_stock_price),
            ("MIN_DRAWDOWN_PERCENT", self.min_drawdown_percent),
            ("MIN_GAIN_PERCENT", self.min_gain_percent),
        ];
        if let Some((name, v)) = thresholds.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(AnalysisError::ConfigError(format!("{} must be a non-negative number, got {}", name, v)));
        }

        if self.picks_cache_ttl_secs < 0 || self.constituents_cache_ttl_secs < 0 {
            return Err(AnalysisError::ConfigError("cache TTLs must not be negative".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_stock_price, 10.0);
        assert_eq!(config.picks_cache_ttl_secs, 3600);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = EngineConfig {
            historical_batch_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::ConfigError(_))));
    }

    #[test]
    fn test_oversized_quote_batch_rejected() {
        let config = EngineConfig {
            quote_batch_size: 5000,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = EngineConfig {
            min_stock_price: -1.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
