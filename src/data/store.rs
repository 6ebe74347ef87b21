use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::data::types::{HistoricalRecord, PredictionResult};

/// SQLite-backed store for market results and emitted predictions. This is
/// the engine's external collaborator: the engine itself never touches it.
pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { conn })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                market TEXT NOT NULL,
                open TEXT,
                jodi TEXT,
                close TEXT,
                open_sum INTEGER,
                close_sum INTEGER,
                mirror_open TEXT,
                mirror_close TEXT,
                reverse_jodi TEXT,
                day_of_week INTEGER NOT NULL,
                is_weekend INTEGER NOT NULL,
                UNIQUE(date, market)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                market TEXT NOT NULL,
                open_digits TEXT NOT NULL,
                close_digits TEXT NOT NULL,
                jodi_list TEXT NOT NULL,
                patti_list TEXT NOT NULL,
                confidence_score REAL NOT NULL,
                UNIQUE(date, market)
            );

            CREATE INDEX IF NOT EXISTS idx_results_market_date ON results(market, date);
            CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(date);
            "#,
        )?;
        Ok(())
    }

    /// Insert or update the result for (date, market).
    pub fn upsert_result(&self, record: &HistoricalRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO results (
                date, market, open, jodi, close, open_sum, close_sum,
                mirror_open, mirror_close, reverse_jodi, day_of_week, is_weekend
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(date, market) DO UPDATE SET
                open = excluded.open,
                jodi = excluded.jodi,
                close = excluded.close,
                open_sum = excluded.open_sum,
                close_sum = excluded.close_sum,
                mirror_open = excluded.mirror_open,
                mirror_close = excluded.mirror_close,
                reverse_jodi = excluded.reverse_jodi,
                day_of_week = excluded.day_of_week,
                is_weekend = excluded.is_weekend
            "#,
            params![
                record.date,
                record.market,
                record.open,
                record.jodi,
                record.close,
                record.open_sum,
                record.close_sum,
                record.mirror_open,
                record.mirror_close,
                record.reverse_jodi,
                record.day_of_week,
                record.is_weekend,
            ],
        )?;
        Ok(())
    }

    /// The most recent `size` results for a market, ascending by date.
    pub fn get_window(&self, market: &str, size: usize) -> Result<Vec<HistoricalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, market, open, jodi, close, open_sum, close_sum,
                    mirror_open, mirror_close, reverse_jodi, day_of_week, is_weekend
             FROM results
             WHERE market = ?1
             ORDER BY date DESC
             LIMIT ?2",
        )?;

        let mut records = stmt
            .query_map(params![market, size as i64], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }

    pub fn get_result(&self, date: NaiveDate, market: &str) -> Result<Option<HistoricalRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT date, market, open, jodi, close, open_sum, close_sum,
                        mirror_open, mirror_close, reverse_jodi, day_of_week, is_weekend
                 FROM results
                 WHERE date = ?1 AND market = ?2",
                params![date, market],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    pub fn latest_result_date(&self, market: &str) -> Result<Option<NaiveDate>> {
        let date = self
            .conn
            .query_row(
                "SELECT MAX(date) FROM results WHERE market = ?1",
                params![market],
                |row| row.get::<_, Option<NaiveDate>>(0),
            )
            .optional()?
            .flatten();
        Ok(date)
    }

    pub fn prediction_exists(&self, date: NaiveDate, market: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM predictions WHERE date = ?1 AND market = ?2",
            params![date, market],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The emit sink: list fields are stored as JSON text.
    pub fn insert_prediction(&self, prediction: &PredictionResult) -> Result<()> {
        self.conn.execute(
            "INSERT INTO predictions (
                date, market, open_digits, close_digits, jodi_list, patti_list, confidence_score
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                prediction.date,
                prediction.market,
                serde_json::to_string(&prediction.open_digits)?,
                serde_json::to_string(&prediction.close_digits)?,
                serde_json::to_string(&prediction.jodi_list)?,
                serde_json::to_string(&prediction.patti_list)?,
                prediction.confidence_score,
            ],
        )?;
        Ok(())
    }

    pub fn get_prediction(&self, date: NaiveDate, market: &str) -> Result<Option<PredictionResult>> {
        let row = self
            .conn
            .query_row(
                "SELECT date, market, open_digits, close_digits, jodi_list, patti_list,
                        confidence_score
                 FROM predictions
                 WHERE date = ?1 AND market = ?2",
                params![date, market],
                row_to_raw_prediction,
            )
            .optional()?;

        row.map(raw_to_prediction).transpose()
    }

    /// All predictions on or after `since`, ascending by date.
    pub fn predictions_since(&self, since: NaiveDate) -> Result<Vec<PredictionResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, market, open_digits, close_digits, jodi_list, patti_list,
                    confidence_score
             FROM predictions
             WHERE date >= ?1
             ORDER BY date",
        )?;

        let rows = stmt
            .query_map(params![since], row_to_raw_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(raw_to_prediction).collect()
    }
}

type RawPrediction = (NaiveDate, String, String, String, String, String, f64);

fn row_to_raw_prediction(row: &Row) -> rusqlite::Result<RawPrediction> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn raw_to_prediction(raw: RawPrediction) -> Result<PredictionResult> {
    let (date, market, open_digits, close_digits, jodi_list, patti_list, confidence_score) = raw;
    Ok(PredictionResult {
        date,
        market,
        open_digits: serde_json::from_str(&open_digits)?,
        close_digits: serde_json::from_str(&close_digits)?,
        jodi_list: serde_json::from_str(&jodi_list)?,
        patti_list: serde_json::from_str(&patti_list)?,
        confidence_score,
    })
}

fn row_to_record(row: &Row) -> rusqlite::Result<HistoricalRecord> {
    Ok(HistoricalRecord {
        date: row.get(0)?,
        market: row.get(1)?,
        open: row.get(2)?,
        jodi: row.get(3)?,
        close: row.get(4)?,
        open_sum: row.get(5)?,
        close_sum: row.get(6)?,
        mirror_open: row.get(7)?,
        mirror_close: row.get(8)?,
        reverse_jodi: row.get(9)?,
        day_of_week: row.get(10)?,
        is_weekend: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn record(day: u32, jodi: &str) -> HistoricalRecord {
        HistoricalRecord::new(
            NaiveDate::from_ymd_opt(2026, 7, day).unwrap(),
            "Kalyan",
            Some("470".to_string()),
            Some(jodi.to_string()),
            Some("127".to_string()),
        )
    }

    fn prediction(day: u32, market: &str) -> PredictionResult {
        PredictionResult {
            date: NaiveDate::from_ymd_opt(2026, 7, day).unwrap(),
            market: market.to_string(),
            open_digits: vec!["4".to_string(), "1".to_string()],
            close_digits: vec!["7".to_string(), "2".to_string()],
            jodi_list: (10..20).map(|n| n.to_string()).collect(),
            patti_list: vec![
                "123".to_string(),
                "456".to_string(),
                "789".to_string(),
                "047".to_string(),
            ],
            confidence_score: 0.82,
        }
    }

    #[test]
    fn test_window_ascending_and_limited() {
        let store = ResultStore::open_in_memory().unwrap();
        for day in 1..=8 {
            store.upsert_result(&record(day, "27")).unwrap();
        }

        let window = store.get_window("Kalyan", 5).unwrap();
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].date, NaiveDate::from_ymd_opt(2026, 7, 4).unwrap());
        assert_eq!(window[4].date, NaiveDate::from_ymd_opt(2026, 7, 8).unwrap());
        assert!(window.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let store = ResultStore::open_in_memory().unwrap();
        store.upsert_result(&record(1, "27")).unwrap();
        store.upsert_result(&record(1, "72")).unwrap();

        let window = store.get_window("Kalyan", 10).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].jodi, Some("72".to_string()));
        assert_eq!(window[0].reverse_jodi, Some("27".to_string()));
    }

    #[test]
    fn test_latest_result_date() {
        let store = ResultStore::open_in_memory().unwrap();
        assert_eq!(store.latest_result_date("Kalyan").unwrap(), None);

        store.upsert_result(&record(3, "27")).unwrap();
        store.upsert_result(&record(9, "72")).unwrap();
        assert_eq!(
            store.latest_result_date("Kalyan").unwrap(),
            Some(NaiveDate::from_ymd_opt(2026, 7, 9).unwrap())
        );
    }

    #[test]
    fn test_prediction_roundtrip() {
        let store = ResultStore::open_in_memory().unwrap();
        let original = prediction(15, "Kalyan");

        assert!(!store
            .prediction_exists(original.date, &original.market)
            .unwrap());
        store.insert_prediction(&original).unwrap();
        assert!(store
            .prediction_exists(original.date, &original.market)
            .unwrap());

        let loaded = store
            .get_prediction(original.date, &original.market)
            .unwrap()
            .unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_predictions_since() {
        let store = ResultStore::open_in_memory().unwrap();
        store.insert_prediction(&prediction(5, "Kalyan")).unwrap();
        store.insert_prediction(&prediction(20, "Kalyan")).unwrap();
        store.insert_prediction(&prediction(25, "Milan Day")).unwrap();

        let recent = store
            .predictions_since(NaiveDate::from_ymd_opt(2026, 7, 10).unwrap())
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|p| p.date.day() >= 20));
    }
}
