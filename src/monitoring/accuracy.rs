use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::data::store::ResultStore;
use crate::data::types::{HistoricalRecord, PredictionResult};
use crate::engine::model::canonicalize;

/// Outcome of checking one prediction against its published result.
/// `None` means the result lacked the field needed for that check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub open: Option<bool>,
    pub close: Option<bool>,
    pub jodi: Option<bool>,
    pub patti_open: Option<bool>,
    pub patti_close: Option<bool>,
}

/// Compare a prediction with the actual result. Open/close predictions
/// match on the draw's edge digits (first and third); pattis match on
/// canonical form.
pub fn match_prediction(prediction: &PredictionResult, result: &HistoricalRecord) -> MatchReport {
    let mut report = MatchReport::default();

    if let Some(open) = result.open.as_deref() {
        if let Some(actual) = edge_digits(open) {
            report.open = Some(prediction.open_digits == actual);
        }
        if let Some(canonical) = canonicalize(open) {
            report.patti_open = Some(prediction.patti_list.contains(&canonical));
        }
    }

    if let Some(close) = result.close.as_deref() {
        if let Some(actual) = edge_digits(close) {
            report.close = Some(prediction.close_digits == actual);
        }
        if let Some(canonical) = canonicalize(close) {
            report.patti_close = Some(prediction.patti_list.contains(&canonical));
        }
    }

    if let Some(jodi) = result.jodi.as_deref() {
        report.jodi = Some(prediction.jodi_list.iter().any(|j| j == jodi));
    }

    report
}

fn edge_digits(draw: &str) -> Option<Vec<String>> {
    let chars: Vec<char> = draw.chars().collect();
    if chars.len() != 3 || !chars.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(vec![chars[0].to_string(), chars[2].to_string()])
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCounts {
    pub total: usize,
    pub open_matches: usize,
    pub close_matches: usize,
    pub jodi_matches: usize,
}

impl MatchCounts {
    fn tally(&mut self, report: &MatchReport) {
        self.total += 1;
        if report.open == Some(true) {
            self.open_matches += 1;
        }
        if report.close == Some(true) {
            self.close_matches += 1;
        }
        if report.jodi == Some(true) {
            self.jodi_matches += 1;
        }
    }

    pub fn jodi_accuracy_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.jodi_matches as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccuracySummary {
    pub overall: MatchCounts,
    pub per_market: HashMap<String, MatchCounts>,
}

/// Score every stored prediction from `since` onward against published
/// results. Predictions without a result (or with an unpublished jodi)
/// are left out of the tally.
pub fn accuracy_summary(store: &ResultStore, since: NaiveDate) -> Result<AccuracySummary> {
    let mut summary = AccuracySummary::default();

    for prediction in store.predictions_since(since)? {
        let Some(result) = store.get_result(prediction.date, &prediction.market)? else {
            continue;
        };
        if result.jodi.is_none() {
            continue;
        }

        let report = match_prediction(&prediction, &result);
        summary.overall.tally(&report);
        summary
            .per_market
            .entry(prediction.market.clone())
            .or_default()
            .tally(&report);
    }

    Ok(summary)
}
