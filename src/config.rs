// Promotion Configuration
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const EMBEDDED_DEFAULT: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub source: Source,
    pub drawing: Drawing,
    pub visits: Visits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub data_dir: PathBuf,
}

/// Prize drawing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Drawing {
    pub seed: u64,
    /// Entity holding one row per app check-in, joined with the visiting user.
    pub entries_table: String,
    /// Column carrying the entrant's display name in `entries_table`.
    pub name_column: String,
    /// Paper entrants added to the raffle pool.
    pub manual_entrants: Vec<String>,
}

/// Visit report settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Visits {
    pub ignored_emails: Vec<String>,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub time_zone: String,
}

/// Inclusive promotion window, expressed without a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    /// Day-of-month values for every calendar day the window touches.
    pub fn days_of_month(&self) -> Vec<u32> {
        let last = self.end.date();
        self.start
            .date()
            .iter_days()
            .take_while(|day| *day <= last)
            .map(|day| day.day())
            .collect()
    }
}

impl Visits {
    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.window_start,
            end: self.window_end,
        }
    }

    pub fn zone(&self) -> Result<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| Error::Config(format!("unknown time zone '{}'", self.time_zone)))
    }
}

impl Config {
    /// Reads `config/default.toml` when present, otherwise the copy compiled into the binary.
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::from_path(path)
        } else {
            Self::from_toml_str(EMBEDDED_DEFAULT)
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let window = self.visits.window();
        if window.start > window.end {
            return Err(Error::Config(format!(
                "window_start {} is after window_end {}",
                window.start, window.end
            )));
        }
        self.visits.zone()?;

        if self.drawing.manual_entrants.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::Config("manual entrant names must not be blank".to_string()));
        }
        Ok(())
    }
}
