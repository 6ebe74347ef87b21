use std::collections::HashMap;

use crate::data::types::HistoricalRecord;
use crate::engine::{jodi_string, parse_jodi, EngineError};

/// Extra weight on the full-jodi frequency for the most recent records,
/// decaying linearly from 0.5 (yesterday) toward ~0.07 (a week back).
const RECENCY_SPAN: usize = 7;

/// Frequency, transition and pattern tables mined from one window.
/// Rebuilt on every invocation; never cached or shared across markets.
#[derive(Debug, Clone, Default)]
pub struct PatternModel {
    /// How often each digit 0-9 led a jodi.
    pub first_digit_freq: [f64; 10],
    /// How often each digit 0-9 closed a jodi.
    pub second_digit_freq: [f64; 10],
    /// Full-jodi frequency, recency-boosted and near-miss-seeded.
    pub jodi_freq: HashMap<String, f64>,
    /// Ordered (previous, current) transition counts.
    pub transitions: HashMap<(String, String), f64>,
    /// Exact digit-swap transitions, boosted at 1.5 per occurrence.
    pub flip_transitions: HashMap<(String, String), f64>,
    /// Numeric jump histogram keyed by the jodi the jump started from.
    pub distances: HashMap<(String, u8), f64>,
    /// Tier-weighted neighborhood of each observed jodi.
    pub near_misses: HashMap<(String, String), f64>,
    /// Canonical 3-digit patti frequency synthesized from jodis.
    pub patti_freq: HashMap<String, f64>,
    /// Chronologically last parseable jodi in the window.
    pub last_jodi: Option<String>,
}

/// Scan the window once, pairing each record with its predecessor.
/// Records without a jodi contribute nothing; a present-but-unparseable
/// jodi aborts the build so the caller can fall back.
pub fn build(window: &[HistoricalRecord]) -> Result<PatternModel, EngineError> {
    let mut model = PatternModel::default();

    for i in 1..window.len() {
        let row = &window[i];
        let prev = &window[i - 1];

        let Some(raw) = row.jodi.as_deref() else {
            continue;
        };
        let (first, second) = parse_jodi(raw).ok_or_else(|| EngineError::MalformedRecord {
            date: row.date,
            value: raw.to_string(),
        })?;
        let jodi = jodi_string(first, second);

        model.first_digit_freq[first as usize] += 1.0;
        model.second_digit_freq[second as usize] += 1.0;
        *model.jodi_freq.entry(jodi.clone()).or_insert(0.0) += 1.0;

        let days_ago = window.len() - i;
        if days_ago <= RECENCY_SPAN {
            let recency_weight = 0.5 * (8 - days_ago) as f64 / 7.0;
            *model.jodi_freq.entry(jodi.clone()).or_insert(0.0) += recency_weight;
        }

        if let Some(prev_raw) = prev.jodi.as_deref() {
            let (prev_first, prev_second) =
                parse_jodi(prev_raw).ok_or_else(|| EngineError::MalformedRecord {
                    date: prev.date,
                    value: prev_raw.to_string(),
                })?;
            let prev_jodi = jodi_string(prev_first, prev_second);

            *model
                .transitions
                .entry((prev_jodi.clone(), jodi.clone()))
                .or_insert(0.0) += 1.0;

            let distance = (jodi_value(first, second) - jodi_value(prev_first, prev_second))
                .unsigned_abs() as u8;
            *model
                .distances
                .entry((prev_jodi.clone(), distance))
                .or_insert(0.0) += 1.0;

            if prev_first == second && prev_second == first {
                *model
                    .flip_transitions
                    .entry((prev_jodi, jodi.clone()))
                    .or_insert(0.0) += 1.5;
            }
        }

        expand_near_misses(&mut model, &jodi, first, second);
        synthesize_pattis(&mut model, first, second);
    }

    model.last_jodi = last_parseable_jodi(window)?;

    Ok(model)
}

/// 9x9 digit-offset grid around the observed jodi, offsets wrapping mod 10.
/// Tight misses weigh more; every miss also seeds the plain frequency map
/// at half weight so near neighbors influence frequency ranking.
fn expand_near_misses(model: &mut PatternModel, jodi: &str, first: u8, second: u8) {
    for offset1 in -4i8..=4 {
        for offset2 in -4i8..=4 {
            if offset1 == 0 && offset2 == 0 {
                continue;
            }

            let near_first = (first as i8 + offset1).rem_euclid(10) as u8;
            let near_second = (second as i8 + offset2).rem_euclid(10) as u8;

            let weight = if offset1.abs() <= 1 && offset2.abs() <= 1 {
                0.3
            } else if offset1.abs() <= 2 && offset2.abs() <= 2 {
                0.2
            } else {
                0.1
            };

            let near_jodi = jodi_string(near_first, near_second);
            *model
                .near_misses
                .entry((jodi.to_string(), near_jodi.clone()))
                .or_insert(0.0) += weight;
            *model.jodi_freq.entry(near_jodi).or_insert(0.0) += weight * 0.5;
        }
    }
}

/// No explicit 3-digit draw is tracked on this path, so each jodi seeds two
/// synthetic pattis: middle digit from the digit sum and from the digit gap.
fn synthesize_pattis(model: &mut PatternModel, first: u8, second: u8) {
    let sum_middle = (first + second) % 10;
    *model
        .patti_freq
        .entry(canonical_patti(first, sum_middle, second))
        .or_insert(0.0) += 0.8;

    let diff_middle = (first as i8 - second as i8).unsigned_abs() % 10;
    *model
        .patti_freq
        .entry(canonical_patti(first, diff_middle, second))
        .or_insert(0.0) += 0.6;
}

fn last_parseable_jodi(window: &[HistoricalRecord]) -> Result<Option<String>, EngineError> {
    for record in window.iter().rev() {
        if let Some(raw) = record.jodi.as_deref() {
            let (first, second) = parse_jodi(raw).ok_or_else(|| EngineError::MalformedRecord {
                date: record.date,
                value: raw.to_string(),
            })?;
            return Ok(Some(jodi_string(first, second)));
        }
    }
    Ok(None)
}

fn jodi_value(first: u8, second: u8) -> i16 {
    first as i16 * 10 + second as i16
}

/// Canonical patti key: digits sorted ascending so permutations of the same
/// multiset collapse together.
pub fn canonical_patti(d1: u8, d2: u8, d3: u8) -> String {
    let mut digits = [d1, d2, d3];
    digits.sort_unstable();
    digits.iter().map(|d| d.to_string()).collect()
}

/// Canonicalize an arbitrary 3-digit string, rejecting anything else.
pub fn canonicalize(patti: &str) -> Option<String> {
    let mut digits: Vec<char> = patti.chars().collect();
    if digits.len() != 3 || !digits.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.sort_unstable();
    Some(digits.into_iter().collect())
}

pub fn flip_jodi(jodi: &str) -> String {
    jodi.chars().rev().collect()
}
