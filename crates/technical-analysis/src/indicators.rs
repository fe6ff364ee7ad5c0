use serde::{Deserialize, Serialize};

/// Simple Moving Average, aligned with the input.
///
/// `result[i]` is `None` while fewer than `period` samples are available,
/// otherwise the mean of `data[i + 1 - period..=i]`.
pub fn compute_sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; data.len()];
    }

    let mut result = Vec::with_capacity(data.len());
    for i in 0..data.len() {
        if i + 1 < period {
            result.push(None);
            continue;
        }
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(Some(sum / period as f64));
    }
    result
}

/// Most recent value of an aligned series, `None` when the tail is absent.
pub fn latest_value(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Direction of a moving-average crossover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossoverSignal {
    /// Fast average crossed above the slow one (golden cross)
    Bullish,
    /// Fast average crossed below the slow one (death cross)
    Bearish,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crossover {
    pub signal: Option<CrossoverSignal>,
    /// 0 when the cross happened at the most recent sample
    pub periods_ago: Option<usize>,
}

/// Find the most recent crossover of `fast` over `slow`.
///
/// Scans backward from the last index. Pairs with any absent value are
/// skipped. Equality on the prior sample counts as not yet crossed, so a flat
/// region touching the slow line is not reported as a cross.
pub fn detect_crossover(fast: &[Option<f64>], slow: &[Option<f64>]) -> Crossover {
    let len = fast.len().min(slow.len());
    if len < 2 {
        return Crossover::default();
    }

    for i in (1..len).rev() {
        let (Some(prev_fast), Some(prev_slow), Some(cur_fast), Some(cur_slow)) =
            (fast[i - 1], slow[i - 1], fast[i], slow[i])
        else {
            continue;
        };

        let signal = if prev_fast <= prev_slow && cur_fast > cur_slow {
            CrossoverSignal::Bullish
        } else if prev_fast >= prev_slow && cur_fast < cur_slow {
            CrossoverSignal::Bearish
        } else {
            continue;
        };

        return Crossover {
            signal: Some(signal),
            periods_ago: Some(len - 1 - i),
        };
    }

    Crossover::default()
}

/// Arithmetic mean of the trailing `n` values (or fewer, if shorter).
pub fn trailing_mean(data: &[f64], n: usize) -> Option<f64> {
    if data.is_empty() || n == 0 {
        return None;
    }
    let window = &data[data.len().saturating_sub(n)..];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}
