use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::engine::model::{canonical_patti, flip_jodi, PatternModel};
use crate::engine::{parse_jodi, Candidates};

pub const JODI_TARGET: usize = 10;
pub const PATTI_TARGET: usize = 4;

/// Digit pairs ranked by frequency, a tiered jodi list anchored on the most
/// recent draw, and canonical pattis. Ranking is deterministic; the second
/// digit of each pair and the list backfill use weighted random draws.
pub fn select<R: Rng>(model: &PatternModel, rng: &mut R) -> Candidates {
    let open_digits = pick_digit_pair(&model.first_digit_freq, rng);
    let close_digits = pick_digit_pair(&model.second_digit_freq, rng);
    let jodi_list = build_jodi_list(model, &open_digits, &close_digits, rng);
    let patti_list = build_patti_list(model, &jodi_list, rng);

    Candidates {
        open_digits,
        close_digits,
        jodi_list,
        patti_list,
    }
}

/// Top-ranked digit first; the companion comes from a weighted draw over the
/// remaining nine so repeated runs do not degenerate into one fixed pair.
fn pick_digit_pair<R: Rng>(freq: &[f64; 10], rng: &mut R) -> Vec<String> {
    let mut ranked: Vec<usize> = (0..10).collect();
    ranked.sort_by(|&a, &b| {
        freq[b]
            .partial_cmp(&freq[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let first = ranked[0];
    let rest = &ranked[1..];
    let weights: Vec<f64> = rest.iter().map(|&d| freq[d]).collect();

    let second = match WeightedIndex::new(&weights) {
        Ok(dist) => rest[dist.sample(rng)],
        // All remaining digits unseen: uniform draw, first digit excluded
        Err(_) => rest[rng.gen_range(0..rest.len())],
    };

    vec![first.to_string(), second.to_string()]
}

fn build_jodi_list<R: Rng>(
    model: &PatternModel,
    open_digits: &[String],
    close_digits: &[String],
    rng: &mut R,
) -> Vec<String> {
    let mut list: Vec<String> = Vec::with_capacity(JODI_TARGET);
    let ranked = ranked_desc(&model.jodi_freq);

    // 1. Heaviest historical jodis
    for (jodi, _) in ranked.iter().take(4) {
        push_unique(&mut list, jodi.to_string(), JODI_TARGET);
    }

    // 2. Pairings of the chosen digits, capped so anchored candidates keep room
    'pairs: for open in open_digits {
        for close in close_digits {
            if list.len() >= 7 {
                break 'pairs;
            }
            push_unique(&mut list, format!("{}{}", open, close), 7);
        }
    }

    if let Some(anchor) = model.last_jodi.as_deref() {
        // 3. Jump by the anchor's dominant historical distance, both ways
        if let (Ok(anchor_value), Some(distance)) =
            (anchor.parse::<i64>(), dominant_distance(model, anchor))
        {
            for candidate in [anchor_value + distance, anchor_value - distance] {
                if (0..=99).contains(&candidate) {
                    push_unique(&mut list, format!("{:02}", candidate), JODI_TARGET);
                }
            }
        }

        // 4. The anchor's digit flip
        let flipped = flip_jodi(anchor);
        if flipped != anchor {
            push_unique(&mut list, flipped, JODI_TARGET);
        }

        // 5. The anchor's heaviest near misses
        for near in top_near_misses(model, anchor, 2) {
            push_unique(&mut list, near, JODI_TARGET);
        }
    }

    // 6. Backfill by descending frequency, then random unique jodis
    for (jodi, _) in &ranked {
        if list.len() >= JODI_TARGET {
            break;
        }
        push_unique(&mut list, jodi.to_string(), JODI_TARGET);
    }
    while list.len() < JODI_TARGET {
        let jodi = format!("{}{}", rng.gen_range(0..10), rng.gen_range(0..10));
        push_unique(&mut list, jodi, JODI_TARGET);
    }

    list
}

/// Up to three top synthesized pattis, then middle-digit rules cycled over
/// unused jodi-list entries, then fully random canonical triples.
fn build_patti_list<R: Rng>(
    model: &PatternModel,
    jodi_list: &[String],
    rng: &mut R,
) -> Vec<String> {
    let mut list: Vec<String> = Vec::with_capacity(PATTI_TARGET);

    for (patti, _) in ranked_desc(&model.patti_freq).iter().take(3) {
        push_unique(&mut list, patti.to_string(), PATTI_TARGET);
    }

    let mut jodis = jodi_list.iter();
    while list.len() < PATTI_TARGET {
        match jodis.next() {
            Some(jodi) => {
                let Some((first, second)) = parse_jodi(jodi) else {
                    continue;
                };
                let middle = match list.len() % 3 {
                    0 => (first + second) % 10,
                    1 => (first as i8 - second as i8).unsigned_abs() % 10,
                    _ => rng.gen_range(0..10u8),
                };
                push_unique(&mut list, canonical_patti(first, middle, second), PATTI_TARGET);
            }
            None => {
                let patti = canonical_patti(
                    rng.gen_range(0..10u8),
                    rng.gen_range(0..10u8),
                    rng.gen_range(0..10u8),
                );
                push_unique(&mut list, patti, PATTI_TARGET);
            }
        }
    }

    list
}

/// Descending by weight; ties break toward the smaller key so a fixed seed
/// reproduces the same output.
fn ranked_desc(map: &HashMap<String, f64>) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = map.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(b.0))
    });
    entries
}

fn dominant_distance(model: &PatternModel, anchor: &str) -> Option<i64> {
    model
        .distances
        .iter()
        .filter(|((from, _), _)| from == anchor)
        .max_by(|((_, da), wa), ((_, db), wb)| {
            wa.partial_cmp(wb)
                .unwrap_or(Ordering::Equal)
                .then(db.cmp(da))
        })
        .map(|((_, distance), _)| *distance as i64)
}

fn top_near_misses(model: &PatternModel, anchor: &str, count: usize) -> Vec<String> {
    let mut near: Vec<(&str, f64)> = model
        .near_misses
        .iter()
        .filter(|((from, _), _)| from == anchor)
        .map(|((_, to), &w)| (to.as_str(), w))
        .collect();
    near.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(b.0))
    });
    near.into_iter()
        .take(count)
        .map(|(to, _)| to.to_string())
        .collect()
}

fn push_unique(list: &mut Vec<String>, value: String, cap: usize) {
    if list.len() < cap && !list.contains(&value) {
        list.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::HistoricalRecord;
    use crate::engine::model;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn window(jodis: &[&str]) -> Vec<HistoricalRecord> {
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        jodis
            .iter()
            .enumerate()
            .map(|(i, j)| {
                HistoricalRecord::new(
                    base + Duration::days(i as i64),
                    "Kalyan",
                    None,
                    Some(j.to_string()),
                    None,
                )
            })
            .collect()
    }

    fn select_from(jodis: &[&str], seed: u64) -> Candidates {
        let pattern_model = model::build(&window(jodis)).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        select(&pattern_model, &mut rng)
    }

    #[test]
    fn test_open_digit_leads_with_top_frequency() {
        // First digit 4 dominates
        let candidates = select_from(&["40", "41", "42", "43", "44", "45", "46"], 1);
        assert_eq!(candidates.open_digits[0], "4");
        assert_ne!(candidates.open_digits[1], "4");
    }

    #[test]
    fn test_digit_pair_distinct_even_without_data() {
        let freq = [0.0; 10];
        let mut rng = StdRng::seed_from_u64(5);
        let pair = pick_digit_pair(&freq, &mut rng);

        assert_eq!(pair.len(), 2);
        assert_ne!(pair[0], pair[1]);
    }

    #[test]
    fn test_jodi_list_shape() {
        let candidates = select_from(
            &["27", "72", "14", "58", "63", "90", "41", "33", "85", "27", "72", "14"],
            2,
        );

        assert_eq!(candidates.jodi_list.len(), JODI_TARGET);
        let unique: std::collections::HashSet<_> = candidates.jodi_list.iter().collect();
        assert_eq!(unique.len(), JODI_TARGET);
        for jodi in &candidates.jodi_list {
            assert_eq!(jodi.len(), 2);
        }
    }

    #[test]
    fn test_flip_of_anchor_included() {
        // "27" is the anchor; its flip "72" shows up twice after "27"
        // elsewhere in history as well
        let candidates = select_from(&["27", "72", "50", "27", "72", "50", "27"], 3);
        assert!(candidates.jodi_list.contains(&"72".to_string()));
    }

    #[test]
    fn test_dominant_distance_from_anchor() {
        // Every departure from "27" jumps by 10, and "27" is the anchor
        let candidates = select_from(&["27", "37", "27", "37", "27", "17", "27"], 4);
        let has_jump = candidates.jodi_list.contains(&"37".to_string())
            || candidates.jodi_list.contains(&"17".to_string());
        assert!(has_jump);
    }

    #[test]
    fn test_distance_candidates_stay_in_range() {
        // Anchor "95" with dominant distance 10: 105 is discarded, 85 kept
        let pattern_model = model::build(&window(&["95", "85", "95", "85", "95"])).unwrap();
        assert_eq!(dominant_distance(&pattern_model, "95"), Some(10));

        let mut rng = StdRng::seed_from_u64(6);
        let candidates = select(&pattern_model, &mut rng);
        assert!(candidates.jodi_list.contains(&"85".to_string()));
        assert!(candidates.jodi_list.iter().all(|j| j.len() == 2));
    }

    #[test]
    fn test_patti_list_shape_and_canonical() {
        let candidates = select_from(
            &["27", "72", "14", "58", "63", "90", "41", "33", "85", "27"],
            7,
        );

        assert_eq!(candidates.patti_list.len(), PATTI_TARGET);
        let unique: std::collections::HashSet<_> = candidates.patti_list.iter().collect();
        assert_eq!(unique.len(), PATTI_TARGET);
        for patti in &candidates.patti_list {
            let digits: Vec<char> = patti.chars().collect();
            let mut sorted = digits.clone();
            sorted.sort_unstable();
            assert_eq!(digits, sorted);
        }
    }

    #[test]
    fn test_sum_rule_patti_from_jodi() {
        // Empty patti table: first patti comes from jodi_list[0] via the sum
        // rule. Jodi "12" gives middle 3 and canonical "123".
        let pattern_model = PatternModel {
            last_jodi: Some("12".to_string()),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(8);
        let list = build_patti_list(&pattern_model, &["12".to_string()], &mut rng);

        assert_eq!(list.len(), PATTI_TARGET);
        assert_eq!(list[0], "123");
    }

    #[test]
    fn test_empty_model_still_fills_lists() {
        let pattern_model = PatternModel::default();
        let mut rng = StdRng::seed_from_u64(9);
        let candidates = select(&pattern_model, &mut rng);

        assert_eq!(candidates.jodi_list.len(), JODI_TARGET);
        assert_eq!(candidates.patti_list.len(), PATTI_TARGET);
    }

    #[test]
    fn test_selection_reproducible_under_seed() {
        let jodis = ["27", "72", "14", "58", "63", "90", "41", "33", "85", "27"];
        let a = select_from(&jodis, 42);
        let b = select_from(&jodis, 42);
        assert_eq!(a, b);
    }
}
