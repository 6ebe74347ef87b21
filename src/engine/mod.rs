pub mod confidence;
pub mod fallback;
pub mod model;
pub mod selector;

use chrono::NaiveDate;
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::data::types::{HistoricalRecord, PredictionResult};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not enough usable records: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("record {date} carries malformed jodi {value:?}")]
    MalformedRecord { date: NaiveDate, value: String },
}

/// Candidate set emitted by the selector (or the fallback generator);
/// the caller attaches date, market and confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidates {
    pub open_digits: Vec<String>,
    pub close_digits: Vec<String>,
    pub jodi_list: Vec<String>,
    pub patti_list: Vec<String>,
}

/// Parse a jodi into its two digits. One-digit values are treated as
/// zero-padded; anything else non-numeric is rejected.
pub(crate) fn parse_jodi(raw: &str) -> Option<(u8, u8)> {
    let digits: Vec<u8> = raw
        .trim()
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<_>>()?;

    match digits[..] {
        [second] => Some((0, second)),
        [first, second] => Some((first, second)),
        _ => None,
    }
}

pub(crate) fn jodi_string(first: u8, second: u8) -> String {
    format!("{}{}", first, second)
}

/// Generate a prediction for one market and target date. Total: a thin or
/// faulty window degrades to the random fallback, never to an error.
pub fn generate_prediction<R: Rng>(
    market: &str,
    target_date: NaiveDate,
    records: &[HistoricalRecord],
    engine_config: &EngineConfig,
    difficulty: &HashMap<String, f64>,
    rng: &mut R,
) -> PredictionResult {
    let start = records.len().saturating_sub(engine_config.window_size);
    let window = &records[start..];

    match mined_candidates(window, engine_config, rng) {
        Ok(candidates) => {
            let confidence = confidence::score(market, Some(window), difficulty, rng);
            assemble(market, target_date, candidates, confidence)
        }
        Err(e) => {
            match e {
                EngineError::InsufficientData { .. } => {
                    debug!("{}: {}, using fallback prediction", market, e)
                }
                EngineError::MalformedRecord { .. } => {
                    warn!("{}: {}, using fallback prediction", market, e)
                }
            }
            let candidates = fallback::generate(rng);
            let confidence = confidence::score(market, None, difficulty, rng);
            assemble(market, target_date, candidates, confidence)
        }
    }
}

fn mined_candidates<R: Rng>(
    window: &[HistoricalRecord],
    engine_config: &EngineConfig,
    rng: &mut R,
) -> Result<Candidates, EngineError> {
    if window.len() < engine_config.min_usable_records {
        return Err(EngineError::InsufficientData {
            have: window.len(),
            need: engine_config.min_usable_records,
        });
    }

    let pattern_model = model::build(window)?;
    Ok(selector::select(&pattern_model, rng))
}

fn assemble(
    market: &str,
    target_date: NaiveDate,
    candidates: Candidates,
    confidence: f64,
) -> PredictionResult {
    PredictionResult {
        date: target_date,
        market: market.to_string(),
        open_digits: candidates.open_digits,
        close_digits: candidates.close_digits,
        jodi_list: candidates.jodi_list,
        patti_list: candidates.patti_list,
        confidence_score: confidence,
    }
}
