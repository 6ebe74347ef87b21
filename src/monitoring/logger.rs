use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;

use crate::data::types::PredictionResult;

pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(
                file,
                "date,market,open_digits,close_digits,jodi_list,patti_list,confidence_score"
            )?;
        }

        Ok(Self { log_path })
    }

    /// Append one emitted prediction to the audit log.
    pub fn log_prediction(&self, prediction: &PredictionResult) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.log_path)?;

        writeln!(
            file,
            "{},{},{},{},{},{},{:.2}",
            prediction.date,
            prediction.market,
            prediction.open_digits.join(" "),
            prediction.close_digits.join(" "),
            prediction.jodi_list.join(" "),
            prediction.patti_list.join(" "),
            prediction.confidence_score
        )?;

        Ok(())
    }
}
