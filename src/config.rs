// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};

use crate::extract::forecast::ForecastSpec;
use crate::extract::table::TableSpec;

/// Top-level configuration. Every field has a default so an empty (or absent)
/// YAML file yields a working setup for the weather.gc.ca pages.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Directory for the run log; rotated daily at midnight.
    pub log_dir: PathBuf,
    /// Run log file name prefix; the date is appended on rotation.
    pub log_file: String,
    pub observations: ObservationsConfig,
    pub forecast: ForecastConfig,
}

/// Past-24-hour observation table scraping.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservationsConfig {
    /// `{code}` is replaced by the station code.
    pub url_template: String,
    pub table_id: String,
    pub time_column_prefix: String,
    pub imperial_marker: String,
    pub imperial_class: String,
    pub date_class: String,
    pub missing: String,
    pub file_template: String,
    pub stations: Vec<String>,
}

/// City forecast page scraping.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    pub url_template: String,
    pub conditions_id: String,
    pub forecast_id: String,
    pub history_id: String,
    pub detailed_lag_hours: i64,
    pub file_template: String,
    /// City name → location code.
    pub cities: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            log_file: "wxscrape.log".to_string(),
            observations: ObservationsConfig::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl Default for ObservationsConfig {
    fn default() -> Self {
        Self {
            url_template: "https://weather.gc.ca/past_conditions/index_e.html?station={code}"
                .to_string(),
            table_id: "past24Table".to_string(),
            time_column_prefix: "Date / Time".to_string(),
            imperial_marker: "i".to_string(),
            imperial_class: "imperial".to_string(),
            date_class: "table-date".to_string(),
            missing: "Missing".to_string(),
            file_template: "past-24-hr-{code}-data.csv".to_string(),
            stations: vec!["vou".to_string()],
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let cities = [
            ("Victoria", "bc-85"),
            ("Vancouver", "bc-74"),
            ("Prince George", "bc-79"),
            ("Whitehorse", "yt-16"),
            ("Calgary", "ab-52"),
            ("Edmonton", "ab-50"),
            ("Yellowknife", "nt-24"),
            ("Regina", "sk-32"),
            ("Winnipeg", "mb-38"),
            ("Thunder Bay", "on-100"),
            ("Toronto", "on-143"),
            ("Ottawa", "on-118"),
            ("Iqaluit", "nu-21"),
            ("Montreal", "qc-147"),
            ("Quebec", "qc-133"),
            ("Fredericton", "nb-29"),
            ("Halifax", "ns-19"),
            ("St. John's", "nl-24"),
        ]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect();

        Self {
            url_template: "https://weather.gc.ca/city/pages/{code}_metric_e.html".to_string(),
            conditions_id: "wxo-conditiondetails".to_string(),
            forecast_id: "wxo-cityforecast".to_string(),
            history_id: "historicaldata".to_string(),
            detailed_lag_hours: 3,
            file_template: "forecast-{code}-data.csv".to_string(),
            cities,
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise start from defaults; then apply
    /// `WXSCRAPE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_yaml(&text).with_context(|| format!("parsing config {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // serde_yaml rejects an empty document for a struct; treat it as defaults
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var("WXSCRAPE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(level) = env::var("WXSCRAPE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(dir) = env::var("WXSCRAPE_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
    }
}

impl ObservationsConfig {
    pub fn table_spec(&self) -> TableSpec {
        TableSpec {
            table_id: self.table_id.clone(),
            time_column_prefix: self.time_column_prefix.clone(),
            imperial_marker: self.imperial_marker.clone(),
            imperial_class: self.imperial_class.clone(),
            date_class: self.date_class.clone(),
            missing: self.missing.clone(),
        }
    }
}

impl ForecastConfig {
    pub fn forecast_spec(&self) -> ForecastSpec {
        ForecastSpec {
            conditions_id: self.conditions_id.clone(),
            forecast_id: self.forecast_id.clone(),
            history_id: self.history_id.clone(),
            detailed_lag_hours: self.detailed_lag_hours,
        }
    }
}
