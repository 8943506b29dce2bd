// src/extract/forecast.rs

use chrono::{Datelike, Duration, NaiveDateTime};
use scraper::Html;
use tracing::{info, instrument, warn};

use super::page_title;
use super::select_unique;
use super::text_block::{FieldSpec, FieldValue, Fields, TextBlock};
use crate::error::ScrapeError;
use crate::store::types::{Record, RecordSet, CAPTURE_FORMAT};

pub const TIME_LABEL: &str = "Datetime";
pub const LOCATION_CODE: &str = "Loc_code";
/// Days covered by the outlook and the detailed forecast.
pub const FORECAST_DAYS: i64 = 6;

/// Element ids of the three sections read from a city page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastSpec {
    /// `div` holding current conditions.
    pub conditions_id: String,
    /// `section` holding the multi-day outlook and the detailed forecast.
    pub forecast_id: String,
    /// `section` holding yesterday's extremes.
    pub history_id: String,
    /// The detailed forecast's day labels lag the capture instant by this much.
    pub detailed_lag_hours: i64,
}

/// One scrape of one city page. Fields that could not be resolved are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub captured: NaiveDateTime,
    pub location_code: String,
    pub fields: Fields,
}

impl FlatRecord {
    pub fn timestamp(&self) -> String {
        self.captured.format(CAPTURE_FORMAT).to_string()
    }

    /// One-row record set over [`forecast_columns`]; absent fields become
    /// empty cells.
    pub fn into_record_set(self) -> RecordSet {
        let columns: Vec<String> = forecast_columns().into_iter().skip(1).collect();
        let values = columns
            .iter()
            .map(|c| {
                if c == LOCATION_CODE {
                    self.location_code.clone()
                } else {
                    self.fields.get(c).map(|v| v.to_string()).unwrap_or_default()
                }
            })
            .collect();
        let mut set = RecordSet::new(TIME_LABEL, columns);
        set.records.push(Record::new(self.timestamp(), values));
        set
    }
}

/// Persisted column order, time label first.
pub fn forecast_columns() -> Vec<String> {
    let mut cols: Vec<String> = [
        TIME_LABEL,
        LOCATION_CODE,
        "Location",
        "Date_string",
        "Conditions",
        "Temperature",
        "Pressure",
        "Humidity",
        "Wind",
        "Visibility",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for prefix in [
        "Forecast_high",
        "Forecast_low",
        "Forecast_precip",
        "Forecast_detailed",
    ] {
        cols.extend((1..=FORECAST_DAYS).map(|i| format!("{}{}", prefix, i)));
    }
    cols.extend(
        ["Yesterday_max", "Yesterday_min", "Yesterday_precip"]
            .iter()
            .map(|s| s.to_string()),
    );
    cols
}

fn condition_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("Location", "Observed at:", 1),
        FieldSpec::text("Date_string", "Date:", 1),
        FieldSpec::text("Conditions", "Condition:", 1),
        FieldSpec::number("Temperature", "Temperature:", 1),
        FieldSpec::number("Pressure", "Pressure:", 1),
        FieldSpec::number("Humidity", "Humidity:", 1),
        FieldSpec::number("Visibility", "Visibility:", 1),
        FieldSpec::text("Wind", "Wind:", 1),
    ]
}

fn history_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::number("Yesterday_max", "Max:", 1),
        FieldSpec::number("Yesterday_min", "Min:", 1),
        FieldSpec::number("Yesterday_precip", "Precip:", 1),
    ]
}

/// Scrape current conditions, the six-day outlook, the detailed forecast and
/// yesterday's extremes from a parsed city page.
#[instrument(level = "info", skip(doc, spec))]
pub fn scrape_city_forecast(
    doc: &Html,
    spec: &ForecastSpec,
    loc_code: &str,
    now: NaiveDateTime,
) -> Result<FlatRecord, ScrapeError> {
    if let Some(title) = page_title(doc) {
        info!("Data read from {}", title);
    }

    let conditions = section_block(doc, "div", &spec.conditions_id)?;
    let forecast = section_block(doc, "section", &spec.forecast_id)?;
    let history = section_block(doc, "section", &spec.history_id)?;

    let mut fields = Fields::new();
    conditions.resolve_into(&condition_fields(), &mut fields);
    daily_outlook(&forecast, now, &mut fields);
    detailed_forecast(&forecast, now - Duration::hours(spec.detailed_lag_hours), &mut fields);
    history.resolve_into(&history_fields(), &mut fields);

    Ok(FlatRecord {
        captured: now,
        location_code: loc_code.to_string(),
        fields,
    })
}

fn section_block(doc: &Html, tag: &str, id: &str) -> Result<TextBlock, ScrapeError> {
    let el = select_unique(doc, tag, id)?;
    Ok(TextBlock::new(&el.text().collect::<String>()))
}

/// For each of the next six days the abbreviated weekday is the label. When
/// the line two below it holds a `%`, that line is the precipitation chance
/// and high/low sit at offsets 3/4; otherwise precipitation is 0 and high/low
/// sit at offsets 2/3. The layout is positional: a day whose lines shift will
/// resolve the wrong lines or none.
pub fn daily_outlook(block: &TextBlock, now: NaiveDateTime, out: &mut Fields) {
    for i in 1..=FORECAST_DAYS {
        let day = now + Duration::days(i);
        let name = day.format("%a").to_string();

        let has_percent = match block.find_line(&name, 2) {
            Ok(line) => line.contains('%'),
            Err(e) => {
                warn!("{}", e);
                false
            }
        };

        let high_offset = if has_percent {
            if let Some(p) = block.number_or_warn(&name, 2) {
                out.insert(format!("Forecast_precip{}", i), FieldValue::Number(p));
            }
            3
        } else {
            out.insert(format!("Forecast_precip{}", i), FieldValue::Number(0.0));
            2
        };

        if let Some(high) = block.number_or_warn(&name, high_offset) {
            out.insert(format!("Forecast_high{}", i), FieldValue::Number(high));
        }
        if let Some(low) = block.number_or_warn(&name, high_offset + 1) {
            out.insert(format!("Forecast_low{}", i), FieldValue::Number(low));
        }
    }
}

/// Detailed text for each of the next six days, labelled like `Sun,13Oct`.
pub fn detailed_forecast(block: &TextBlock, base: NaiveDateTime, out: &mut Fields) {
    for i in 1..=FORECAST_DAYS {
        let day = base + Duration::days(i);
        let label = format!("{},{}{}", day.format("%a"), day.day(), day.format("%b"));
        if let Some(text) = block.line_or_warn(&label, 1) {
            out.insert(format!("Forecast_detailed{}", i), FieldValue::Text(text));
        }
    }
}
