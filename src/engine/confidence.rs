use rand::Rng;
use std::collections::{HashMap, HashSet};

use crate::data::types::HistoricalRecord;
use crate::engine::parse_jodi;

/// Signals are measured over the jodis of the most recent 30 records.
const SIGNAL_WINDOW: usize = 30;
/// Below this many usable jodis the score falls back to a moderate default.
const MIN_USABLE_JODIS: usize = 10;
const DEFAULT_MARKET_FACTOR: f64 = 0.75;
const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Stateless confidence estimate in [0.65, 0.95] for data-backed windows,
/// a uniform draw in [0.70, 0.90] when no window is supplied.
pub fn score<R: Rng>(
    market: &str,
    window: Option<&[HistoricalRecord]>,
    difficulty: &HashMap<String, f64>,
    rng: &mut R,
) -> f64 {
    let Some(records) = window else {
        return round2(rng.gen_range(0.70..=0.90));
    };

    let start = records.len().saturating_sub(SIGNAL_WINDOW);
    let parsed: Option<Vec<(u8, u8)>> = records[start..]
        .iter()
        .filter_map(|r| r.jodi.as_deref())
        .map(parse_jodi)
        .collect();

    // Unparseable jodis get the same moderate default as thin data
    let Some(jodis) = parsed else {
        return DEFAULT_CONFIDENCE;
    };
    if jodis.len() < MIN_USABLE_JODIS {
        return DEFAULT_CONFIDENCE;
    }

    let signals = PatternSignals::measure(&jodis);
    let market_factor = difficulty
        .get(market)
        .copied()
        .unwrap_or(DEFAULT_MARKET_FACTOR);

    let confidence = 0.65 + 0.15 * signals.weighted_total() + 0.15 * market_factor;
    round2(confidence.clamp(0.65, 0.95))
}

/// Normalized pattern signals over a jodi sequence. Each is in [0, 1];
/// the weighted total saturates at 0.8.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSignals {
    pub repeat_ratio: f64,
    pub predictability: f64,
    pub near_miss_ratio: f64,
    pub flip_ratio: f64,
}

impl PatternSignals {
    pub fn measure(jodis: &[(u8, u8)]) -> Self {
        let distinct: HashSet<(u8, u8)> = jodis.iter().copied().collect();
        let repeat_ratio = (((jodis.len() - distinct.len()) as f64) / 10.0).min(1.0);

        let mut digit_counts = [0usize; 10];
        for &(first, second) in jodis {
            digit_counts[first as usize] += 1;
            digit_counts[second as usize] += 1;
        }
        let predictability = 1.0 - entropy(&digit_counts) / 10f64.log2();

        let mut near_misses = 0usize;
        let mut flips = 0usize;
        for pair in jodis.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if (prev.0 as i8 - cur.0 as i8).abs() <= 1 || (prev.1 as i8 - cur.1 as i8).abs() <= 1 {
                near_misses += 1;
            }
            if prev.0 == cur.1 && prev.1 == cur.0 {
                flips += 1;
            }
        }
        let pair_count = jodis.len().saturating_sub(1).max(1) as f64;

        Self {
            repeat_ratio,
            predictability,
            near_miss_ratio: near_misses as f64 / pair_count,
            flip_ratio: flips as f64 / pair_count,
        }
    }

    pub fn weighted_total(&self) -> f64 {
        0.3 * self.repeat_ratio
            + 0.2 * self.predictability
            + 0.2 * self.near_miss_ratio
            + 0.1 * self.flip_ratio
    }
}

/// Shannon entropy (bits) of the pooled digit occurrence counts.
fn entropy(counts: &[usize; 10]) -> f64 {
    let total = counts.iter().sum::<usize>().max(1) as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
