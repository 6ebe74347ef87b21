use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One market outcome for one calendar date. The (date, market) pair is
/// unique; windows handed to the engine are ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub market: String,
    /// 3-digit opening draw, absent when the market published no result.
    pub open: Option<String>,
    /// 2-digit pairing of the draws, zero-padded.
    pub jodi: Option<String>,
    /// 3-digit closing draw.
    pub close: Option<String>,
    pub open_sum: Option<u32>,
    pub close_sum: Option<u32>,
    pub mirror_open: Option<String>,
    pub mirror_close: Option<String>,
    pub reverse_jodi: Option<String>,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u8,
    pub is_weekend: bool,
}

impl HistoricalRecord {
    /// Build a record, normalizing the jodi to two digits and computing the
    /// derived fields for whichever raw values parse. Unparseable raw values
    /// are kept as-is so the engine can surface them.
    pub fn new(
        date: NaiveDate,
        market: impl Into<String>,
        open: Option<String>,
        jodi: Option<String>,
        close: Option<String>,
    ) -> Self {
        let jodi = jodi.map(|j| zero_pad_jodi(&j));
        let day_of_week = date.weekday().num_days_from_monday() as u8;

        Self {
            open_sum: open.as_deref().and_then(digit_sum),
            close_sum: close.as_deref().and_then(digit_sum),
            mirror_open: open.as_deref().and_then(mirror_value),
            mirror_close: close.as_deref().and_then(mirror_value),
            reverse_jodi: jodi.as_deref().and_then(reverse_jodi),
            day_of_week,
            is_weekend: day_of_week >= 5,
            date,
            market: market.into(),
            open,
            jodi,
            close,
        }
    }
}

/// The engine's output for one (date, market). List fields keep insertion
/// order; pattis are canonical (digits ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub date: NaiveDate,
    pub market: String,
    pub open_digits: Vec<String>,
    pub close_digits: Vec<String>,
    pub jodi_list: Vec<String>,
    pub patti_list: Vec<String>,
    pub confidence_score: f64,
}

fn zero_pad_jodi(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == 1 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn digit_sum(value: &str) -> Option<u32> {
    value
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .map(|digits| digits.iter().sum())
}

/// Each digit replaced by `9 - digit`.
fn mirror_value(value: &str) -> Option<String> {
    if value.len() != 3 {
        return None;
    }
    value
        .chars()
        .map(|c| c.to_digit(10).map(|d| char::from_digit(9 - d, 10).unwrap_or('0')))
        .collect()
}

fn reverse_jodi(jodi: &str) -> Option<String> {
    if jodi.len() == 2 && jodi.chars().all(|c| c.is_ascii_digit()) {
        Some(jodi.chars().rev().collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 3).unwrap() // a Monday
    }

    #[test]
    fn test_derived_fields() {
        let record = HistoricalRecord::new(
            date(),
            "Kalyan",
            Some("470".to_string()),
            Some("19".to_string()),
            Some("127".to_string()),
        );

        assert_eq!(record.open_sum, Some(11));
        assert_eq!(record.close_sum, Some(10));
        assert_eq!(record.mirror_open, Some("529".to_string()));
        assert_eq!(record.mirror_close, Some("872".to_string()));
        assert_eq!(record.reverse_jodi, Some("91".to_string()));
        assert_eq!(record.day_of_week, 0);
        assert!(!record.is_weekend);
    }

    #[test]
    fn test_missing_draws_leave_derived_empty() {
        let record = HistoricalRecord::new(date(), "Kalyan", None, None, None);

        assert_eq!(record.open_sum, None);
        assert_eq!(record.mirror_open, None);
        assert_eq!(record.reverse_jodi, None);
    }

    #[test]
    fn test_jodi_zero_padding() {
        let record = HistoricalRecord::new(date(), "Kalyan", None, Some("7".to_string()), None);

        assert_eq!(record.jodi, Some("07".to_string()));
        assert_eq!(record.reverse_jodi, Some("70".to_string()));
    }

    #[test]
    fn test_unparseable_values_kept_raw() {
        let record = HistoricalRecord::new(
            date(),
            "Kalyan",
            Some("Off".to_string()),
            Some("XX".to_string()),
            None,
        );

        // Raw values survive so the engine can flag them; derived stay empty
        assert_eq!(record.open, Some("Off".to_string()));
        assert_eq!(record.jodi, Some("XX".to_string()));
        assert_eq!(record.open_sum, None);
        assert_eq!(record.reverse_jodi, None);
    }

    #[test]
    fn test_weekend_flag() {
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 2).unwrap();
        let record = HistoricalRecord::new(sunday, "Kalyan", None, None, None);

        assert_eq!(record.day_of_week, 6);
        assert!(record.is_weekend);
    }
}
