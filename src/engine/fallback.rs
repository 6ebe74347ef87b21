use rand::Rng;

use crate::engine::model::canonical_patti;
use crate::engine::{parse_jodi, Candidates};

/// Pure-random candidate set, used when the window is too thin or the
/// pattern path failed. Total: this is the last line of defense and can
/// never itself fail.
pub fn generate<R: Rng>(rng: &mut R) -> Candidates {
    let open_digits = random_digit_pair(rng);
    let close_digits = random_digit_pair(rng);

    let mut jodi_list: Vec<String> = Vec::with_capacity(10);
    while jodi_list.len() < 10 {
        let jodi = format!("{}{}", rng.gen_range(0..10), rng.gen_range(0..10));
        if !jodi_list.contains(&jodi) {
            jodi_list.push(jodi);
        }
    }

    let mut patti_list: Vec<String> = Vec::with_capacity(4);
    for jodi in jodi_list.iter().take(2) {
        let Some((first, second)) = parse_jodi(jodi) else {
            continue;
        };
        let patti = canonical_patti(first, rng.gen_range(0..10u8), second);
        if !patti_list.contains(&patti) {
            patti_list.push(patti);
        }
    }
    while patti_list.len() < 4 {
        let patti = canonical_patti(
            rng.gen_range(0..10u8),
            rng.gen_range(0..10u8),
            rng.gen_range(0..10u8),
        );
        if !patti_list.contains(&patti) {
            patti_list.push(patti);
        }
    }

    Candidates {
        open_digits,
        close_digits,
        jodi_list,
        patti_list,
    }
}

/// Two distinct random digits, order shuffled in roughly 40% of draws.
fn random_digit_pair<R: Rng>(rng: &mut R) -> Vec<String> {
    let first = rng.gen_range(0..10u8);
    let mut second = rng.gen_range(0..10u8);
    while second == first {
        second = rng.gen_range(0..10u8);
    }

    let mut pair = vec![first.to_string(), second.to_string()];
    if rng.gen_bool(0.4) {
        pair.reverse();
    }
    pair
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_fallback_shape() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let candidates = generate(&mut rng);

            assert_eq!(candidates.open_digits.len(), 2);
            assert_ne!(candidates.open_digits[0], candidates.open_digits[1]);
            assert_eq!(candidates.close_digits.len(), 2);
            assert_ne!(candidates.close_digits[0], candidates.close_digits[1]);

            assert_eq!(candidates.jodi_list.len(), 10);
            let unique_jodis: HashSet<_> = candidates.jodi_list.iter().collect();
            assert_eq!(unique_jodis.len(), 10);
            assert!(candidates.jodi_list.iter().all(|j| j.len() == 2));

            assert_eq!(candidates.patti_list.len(), 4);
            let unique_pattis: HashSet<_> = candidates.patti_list.iter().collect();
            assert_eq!(unique_pattis.len(), 4);
            for patti in &candidates.patti_list {
                let digits: Vec<char> = patti.chars().collect();
                let mut sorted = digits.clone();
                sorted.sort_unstable();
                assert_eq!(digits, sorted);
            }
        }
    }

    #[test]
    fn test_fallback_reproducible_under_seed() {
        let mut rng_a = StdRng::seed_from_u64(123);
        let mut rng_b = StdRng::seed_from_u64(123);
        assert_eq!(generate(&mut rng_a), generate(&mut rng_b));
    }
}
