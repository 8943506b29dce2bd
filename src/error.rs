// src/error.rs

use thiserror::Error;

/// Fatal extraction / merge failures. Any of these aborts the scrape of the
/// current entity; no partial record set is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// Expected element missing or ambiguous.
    #[error("expected exactly one element matching `{selector}`, found {found}")]
    Structure { selector: String, found: usize },

    #[error("no column in table `{table_id}` starts with `{prefix}`")]
    MissingTimeColumn { table_id: String, prefix: String },

    #[error("row {row} of table `{table_id}` has {found} cells, expected {expected}")]
    RowShape {
        table_id: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("could not parse date header `{text}` in table `{table_id}`")]
    DateContext { table_id: String, text: String },

    #[error("could not parse clock time `{text}` in row {row} of table `{table_id}`")]
    ClockTime {
        table_id: String,
        row: usize,
        text: String,
    },

    #[error("duplicate timestamp `{timestamp}` after merge")]
    DuplicateTimestamp { timestamp: String },

    #[error("dataset schema mismatch: existing {existing:?}, new {new:?}")]
    SchemaMismatch {
        existing: Vec<String>,
        new: Vec<String>,
    },

    #[error("invalid timestamp key `{0}`")]
    InvalidTimestamp(String),
}

/// Non-fatal field lookups on the text-block path. Callers log these and
/// leave the field absent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("couldn't find parameter `{label}`")]
    LabelNotFound { label: String },

    #[error("parameter `{label}` found but offset {offset} runs past the end of the block")]
    OffsetOutOfRange { label: String, offset: usize },

    #[error("error converting `{line}` (label `{label}`) to a number")]
    NumberParse { label: String, line: String },
}
