//! Reasoning Generator
//!
//! Rule-based explanation of a score breakdown. Each factor is checked
//! against a fixed threshold and contributes at most one clause.

use crate::models::{round_to, ScoreBreakdown};

pub const RECOVERY_MENTION_THRESHOLD: f64 = 0.6;
pub const STRONG_MOMENTUM_THRESHOLD: f64 = 0.75;
pub const MOMENTUM_MENTION_THRESHOLD: f64 = 0.5;
pub const VOLUME_MENTION_THRESHOLD: f64 = 0.7;
pub const VALUATION_MENTION_THRESHOLD: f64 = 0.8;
pub const MARKET_CAP_MENTION_THRESHOLD: f64 = 0.7;
pub const RECENT_MOMENTUM_MENTION_THRESHOLD: f64 = 0.7;

pub const FALLBACK_REASONING: &str = "Balanced upside potential across multiple factors";

/// Build the explanation from the breakdown plus the raw drawdown and P/E
pub fn generate_reasoning(breakdown: &ScoreBreakdown, drawdown_percent: f64, pe_ratio: Option<f64>) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if breakdown.recovery_potential >= RECOVERY_MENTION_THRESHOLD {
        // Halves round away from zero, after the 2 dp output rounding
        let drawdown = round_to(round_to(drawdown_percent, 2), 0);
        clauses.push(format!("{:.0}% below 52-week high", drawdown));
    }

    if breakdown.momentum >= STRONG_MOMENTUM_THRESHOLD {
        clauses.push("bullish SMA trend".to_string());
    } else if breakdown.momentum >= MOMENTUM_MENTION_THRESHOLD {
        clauses.push("price above SMA20".to_string());
    }

    if breakdown.volume_confirmation >= VOLUME_MENTION_THRESHOLD {
        clauses.push("strong volume accumulation".to_string());
    }

    if breakdown.valuation >= VALUATION_MENTION_THRESHOLD {
        if let Some(pe) = pe_ratio {
            clauses.push(format!("attractive P/E of {:.1}", round_to(pe, 1)));
        }
    }

    if breakdown.market_cap >= MARKET_CAP_MENTION_THRESHOLD {
        clauses.push("large-cap stability".to_string());
    }

    if breakdown.recent_momentum >= RECENT_MOMENTUM_MENTION_THRESHOLD {
        clauses.push("positive recent momentum".to_string());
    }

    if clauses.is_empty() {
        return FALLBACK_REASONING.to_string();
    }

    capitalize_first(&clauses.join(", "))
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_when_nothing_stands_out() {
        let bd = ScoreBreakdown::default();
        assert_eq!(generate_reasoning(&bd, 5.0, None), FALLBACK_REASONING);
    }

    #[test]
    fn test_full_reasoning() {
        let bd = ScoreBreakdown {
            recovery_potential: 0.8,
            momentum: 1.0,
            volume_confirmation: 0.9,
            valuation: 1.0,
            market_cap: 0.9,
            recent_momentum: 0.8,
        };
        assert_eq!(
            generate_reasoning(&bd, 40.4, Some(12.34)),
            "40% below 52-week high, bullish SMA trend, strong volume accumulation, \
             attractive P/E of 12.3, large-cap stability, positive recent momentum"
        );
    }

    #[test]
    fn test_capitalizes_first_clause() {
        let bd = ScoreBreakdown {
            momentum: 0.5,
            ..ScoreBreakdown::default()
        };
        assert_eq!(generate_reasoning(&bd, 5.0, None), "Price above SMA20");
    }

    #[test]
    fn test_valuation_needs_known_pe() {
        let bd = ScoreBreakdown {
            valuation: 1.0,
            ..ScoreBreakdown::default()
        };
        assert_eq!(generate_reasoning(&bd, 5.0, None), FALLBACK_REASONING);
        assert_eq!(generate_reasoning(&bd, 5.0, Some(8.0)), "Attractive P/E of 8.0");
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let bd = ScoreBreakdown {
            recovery_potential: RECOVERY_MENTION_THRESHOLD,
            ..ScoreBreakdown::default()
        };
        assert_eq!(generate_reasoning(&bd, 30.0, None), "30% below 52-week high");

        let below = ScoreBreakdown {
            recovery_potential: 0.59,
            ..ScoreBreakdown::default()
        };
        assert_eq!(generate_reasoning(&below, 29.5, None), FALLBACK_REASONING);
    }

    #[test]
    fn test_deterministic() {
        let bd = ScoreBreakdown {
            recovery_potential: 0.7,
            momentum: 0.5,
            volume_confirmation: 0.5,
            valuation: 0.7,
            market_cap: 0.75,
            recent_momentum: 0.2,
        };
        let first = generate_reasoning(&bd, 35.0, Some(25.0));
        assert_eq!(first, generate_reasoning(&bd, 35.0, Some(25.0)));
        assert_eq!(first, "35% below 52-week high, price above SMA20, large-cap stability");
    }

    #[test]
    fn test_half_values_round_up() {
        let bd = ScoreBreakdown {
            recovery_potential: 0.7,
            valuation: 0.9,
            ..ScoreBreakdown::default()
        };
        assert_eq!(
            generate_reasoning(&bd, 30.5, Some(12.25)),
            "31% below 52-week high, attractive P/E of 12.3"
        );
        // 2 dp rounding first: 30.496 shows as 30.5, then 31
        assert_eq!(generate_reasoning(&bd, 30.496, None), "31% below 52-week high");
    }
}
