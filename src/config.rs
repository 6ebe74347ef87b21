use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub monitoring: MonitoringConfig,
    pub markets: Vec<MarketConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub dry_run: bool,
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Most recent records fed into the pattern model.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Below this the engine emits fallback predictions instead of mined ones.
    #[serde(default = "default_min_usable")]
    pub min_usable_records: usize,
    /// Below this the market is skipped entirely for the cycle.
    #[serde(default = "default_floor")]
    pub min_window_floor: usize,
}

fn default_window_size() -> usize { 60 }
fn default_min_usable() -> usize { 30 }
fn default_floor() -> usize { 10 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_usable_records: default_min_usable(),
            min_window_floor: default_floor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub csv_logging: bool,
    pub csv_log_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub name: String,
    pub open_time: String,
    pub close_time: String,
    /// Operating days, 0 = Monday .. 6 = Sunday.
    pub days: Vec<u8>,
    /// Empirical predictability factor consumed by the confidence scorer.
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
}

fn default_difficulty() -> f64 { 0.75 }

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Per-market difficulty factors for the confidence scorer.
    pub fn difficulty_table(&self) -> HashMap<String, f64> {
        self.markets
            .iter()
            .map(|m| (m.name.clone(), m.difficulty))
            .collect()
    }
}

impl MarketConfig {
    pub fn operates_on(&self, date: NaiveDate) -> bool {
        self.days
            .contains(&(date.weekday().num_days_from_monday() as u8))
    }

    /// Next calendar date after `after` on which this market draws.
    /// Bounded scan; falls back to the very next day if nothing matches.
    pub fn next_operating_day(&self, after: NaiveDate) -> NaiveDate {
        let mut next = after;
        for _ in 0..10 {
            match next.succ_opt() {
                Some(d) => next = d,
                None => break,
            }
            if self.operates_on(next) {
                return next;
            }
        }
        after.succ_opt().unwrap_or(after)
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub database_path: Option<String>,
    pub dry_run_override: Option<bool>,
}

impl EnvConfig {
    pub fn load() -> Self {
        dotenv::dotenv().ok();

        Self {
            database_path: std::env::var("KALYANX_DATABASE").ok(),
            dry_run_override: std::env::var("DRY_RUN").ok().and_then(|v| v.parse().ok()),
        }
    }
}
