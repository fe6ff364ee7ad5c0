//! Opportunity Scoring Module
//!
//! Six independent factors, each mapped to [0, 1], combined with fixed
//! weights into a 0-100 composite. The factors are deliberately simple and
//! monotonic so every score can be explained from its inputs.

use analysis_core::{Fundamentals, HistoricalSeries};
use technical_analysis::{compute_sma, detect_crossover, latest_value, trailing_mean, Crossover};

use crate::models::ScoreBreakdown;

/// Fixed composite weights (sum to 100)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    pub recovery_potential: f64,
    pub momentum: f64,
    pub volume_confirmation: f64,
    pub valuation: f64,
    pub market_cap: f64,
    pub recent_momentum: f64,
}

pub const COMPOSITE_WEIGHTS: FactorWeights = FactorWeights {
    recovery_potential: 25.0,
    momentum: 25.0,
    volume_confirmation: 15.0,
    valuation: 15.0,
    market_cap: 10.0,
    recent_momentum: 10.0,
};

/// Drawdown at which recovery potential saturates
const RECOVERY_CAP_PERCENT: f64 = 50.0;
const VOLUME_RECENT_WINDOW: usize = 10;
const VOLUME_BASELINE_WINDOW: usize = 50;
const FAST_SMA_PERIOD: usize = 5;
const SLOW_SMA_PERIOD: usize = 20;

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Deeper drawdown, more room to recover; saturates at 50%
pub fn score_recovery_potential(drawdown_percent: f64) -> f64 {
    clamp_unit(drawdown_percent / RECOVERY_CAP_PERCENT)
}

/// 0.5 for price above SMA20, another 0.5 for SMA5 above SMA20
pub fn score_momentum(price: f64, sma5: Option<f64>, sma20: Option<f64>) -> f64 {
    let mut score = 0.0;
    if let Some(slow) = sma20 {
        if price > slow {
            score += 0.5;
        }
        if let Some(fast) = sma5 {
            if fast > slow {
                score += 0.5;
            }
        }
    }
    score
}

/// Recent 10-bar average volume against the 50-bar baseline, halved and capped.
/// Neutral (0.5) with fewer than 50 samples or a zero baseline.
pub fn score_volume(volumes: &[f64]) -> f64 {
    if volumes.len() < VOLUME_BASELINE_WINDOW {
        return 0.5;
    }
    let (Some(recent), Some(baseline)) = (
        trailing_mean(volumes, VOLUME_RECENT_WINDOW),
        trailing_mean(volumes, VOLUME_BASELINE_WINDOW),
    ) else {
        return 0.5;
    };
    if baseline == 0.0 {
        return 0.5;
    }
    clamp_unit(recent / baseline / 2.0)
}

/// Piecewise on P/E: the 5-20 band scores best, negative earnings and
/// extreme multiples score worst.
pub fn score_valuation(pe_ratio: Option<f64>) -> f64 {
    match pe_ratio {
        None => 0.5,
        Some(pe) if pe.is_nan() => 0.5,
        Some(pe) if pe <= 0.0 => 0.2,
        Some(pe) if (5.0..=20.0).contains(&pe) => 1.0,
        Some(pe) if pe < 5.0 => 0.6,
        Some(pe) if pe <= 30.0 => 0.7,
        Some(pe) if pe <= 50.0 => 0.4,
        Some(_) => 0.1,
    }
}

/// Log-scaled across roughly $100M..$1T; unknown or non-positive caps get 0.3
pub fn score_market_cap(market_cap: f64) -> f64 {
    if !(market_cap > 0.0) {
        return 0.3;
    }
    clamp_unit((market_cap.log10() - 8.0) / 4.0)
}

/// A -2% day maps to 0, saturating at +4%
pub fn score_recent_momentum(change_percent: f64) -> f64 {
    clamp_unit((change_percent + 2.0) / 6.0)
}

/// Weighted sum of all six factors, 0-100
pub fn composite_score(bd: &ScoreBreakdown) -> f64 {
    let w = COMPOSITE_WEIGHTS;
    bd.recovery_potential * w.recovery_potential
        + bd.momentum * w.momentum
        + bd.volume_confirmation * w.volume_confirmation
        + bd.valuation * w.valuation
        + bd.market_cap * w.market_cap
        + bd.recent_momentum * w.recent_momentum
}

/// Partial sum over the four factors that need no fundamentals
pub fn preliminary_score(bd: &ScoreBreakdown) -> f64 {
    let w = COMPOSITE_WEIGHTS;
    bd.recovery_potential * w.recovery_potential
        + bd.momentum * w.momentum
        + bd.volume_confirmation * w.volume_confirmation
        + bd.recent_momentum * w.recent_momentum
}

/// Moving-average state of a series at its most recent bar
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendSignals {
    pub sma5: Option<f64>,
    pub sma20: Option<f64>,
    pub crossover: Crossover,
}

impl TrendSignals {
    pub fn from_series(series: &HistoricalSeries) -> Self {
        let closes = series.closes();
        let fast = compute_sma(&closes, FAST_SMA_PERIOD);
        let slow = compute_sma(&closes, SLOW_SMA_PERIOD);

        Self {
            sma5: latest_value(&fast),
            sma20: latest_value(&slow),
            crossover: detect_crossover(&fast, &slow),
        }
    }
}

/// Inputs to the technical half of the breakdown
#[derive(Debug, Clone, Copy)]
pub struct TechnicalInputs {
    pub price: f64,
    pub drawdown_percent: f64,
    pub change_percent: f64,
    pub volume_score: f64,
    pub trend: TrendSignals,
}

/// Breakdown with the four cheap factors set; valuation and market cap are 0
pub fn technical_breakdown(inputs: &TechnicalInputs) -> ScoreBreakdown {
    ScoreBreakdown {
        recovery_potential: score_recovery_potential(inputs.drawdown_percent),
        momentum: score_momentum(inputs.price, inputs.trend.sma5, inputs.trend.sma20),
        volume_confirmation: inputs.volume_score,
        valuation: 0.0,
        market_cap: 0.0,
        recent_momentum: score_recent_momentum(inputs.change_percent),
    }
}

/// Fill in the fundamentals factors. Absent fundamentals score neutral.
pub fn with_fundamentals(technical: ScoreBreakdown, fundamentals: Option<&Fundamentals>) -> ScoreBreakdown {
    let pe_ratio = fundamentals.and_then(|f| f.pe_ratio);
    let market_cap = fundamentals.and_then(|f| f.market_cap).unwrap_or(0.0);

    ScoreBreakdown {
        valuation: score_valuation(pe_ratio),
        market_cap: score_market_cap(market_cap),
        ..technical
    }
}
