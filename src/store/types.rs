// src/store/types.rs

use chrono::{Datelike, NaiveDate};

use crate::error::ScrapeError;

/// Canonical minute-resolution key produced by the table extractor.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Capture-instant key used for forecast records.
pub const CAPTURE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row: the time key plus the non-time values, aligned with
/// `RecordSet::columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: String,
    pub values: Vec<String>,
}

impl Record {
    pub fn new(timestamp: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            values,
        }
    }

    /// Calendar year of the key, read from its `YYYY-MM-DD` prefix.
    pub fn year(&self) -> Result<i32, ScrapeError> {
        year_of(&self.timestamp)
    }
}

/// Records sharing one schema, indexed by the time column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Label of the time column; first column of the persisted table.
    pub time_label: String,
    /// Remaining column labels, in table order.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(time_label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            time_label: time_label.into(),
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row as persisted: time label first.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.time_label.clone())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    /// Stable ascending sort on the time key; ties keep insertion order.
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    pub fn min_timestamp(&self) -> Option<&str> {
        self.records.iter().map(|r| r.timestamp.as_str()).min()
    }

    pub fn max_timestamp(&self) -> Option<&str> {
        self.records.iter().map(|r| r.timestamp.as_str()).max()
    }

    pub fn timestamps(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.timestamp.as_str()).collect()
    }

    /// Value of `label` in record `row`, the time column included.
    pub fn get(&self, row: usize, label: &str) -> Option<&str> {
        let record = self.records.get(row)?;
        if label == self.time_label {
            return Some(&record.timestamp);
        }
        let idx = self.columns.iter().position(|c| c == label)?;
        record.values.get(idx).map(String::as_str)
    }
}

pub fn year_of(timestamp: &str) -> Result<i32, ScrapeError> {
    timestamp
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(|d| d.year())
        .ok_or_else(|| ScrapeError::InvalidTimestamp(timestamp.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        let mut set = RecordSet::new("Date / Time PST", vec!["Temp".into(), "Wind".into()]);
        set.records.push(Record::new("2024-03-02 01:00", vec!["4".into(), "N 5".into()]));
        set.records.push(Record::new("2024-03-01 23:00", vec!["5".into(), "Missing".into()]));
        set.records.push(Record::new("2024-03-02 01:00", vec!["6".into(), "calm".into()]));
        set
    }

    #[test]
    fn test_sort_is_stable() {
        let mut set = sample();
        set.sort();
        assert_eq!(
            set.timestamps(),
            vec!["2024-03-01 23:00", "2024-03-02 01:00", "2024-03-02 01:00"]
        );
        assert_eq!(set.get(1, "Temp"), Some("4"));
        assert_eq!(set.get(2, "Temp"), Some("6"));
    }

    #[test]
    fn test_span_and_header() {
        let set = sample();
        assert_eq!(set.min_timestamp(), Some("2024-03-01 23:00"));
        assert_eq!(set.max_timestamp(), Some("2024-03-02 01:00"));
        assert_eq!(set.header(), vec!["Date / Time PST", "Temp", "Wind"]);
        assert_eq!(set.get(0, "Date / Time PST"), Some("2024-03-02 01:00"));
        assert_eq!(set.get(0, "Nope"), None);
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of("2023-12-31 23:00").unwrap(), 2023);
        assert_eq!(year_of("2024-01-01 00:00:05").unwrap(), 2024);
        assert!(year_of("12:00").is_err());
        assert!(year_of("2024-13-01 00:00").is_err());
    }
}
