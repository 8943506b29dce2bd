// src/extract/text_block.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, fmt};
use tracing::warn;

use super::clean_text;
use crate::error::FieldError;

/// Value reported for a `Trace` (non-measurable) amount.
pub const TRACE_AMOUNT: f64 = 0.1;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?\d+(?:\.\d+)?").expect("number regex is valid"));

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(x) => write!(f, "{}", x),
        }
    }
}

/// Resolved fields by name. Unresolved fields are absent, not zero-filled.
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

/// `field` is read from the line `offset` below the first line starting with `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: String,
    pub label: String,
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn text(field: &str, label: &str, offset: usize) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
            offset,
            kind: FieldKind::Text,
        }
    }

    pub fn number(field: &str, label: &str, offset: usize) -> Self {
        Self {
            kind: FieldKind::Number,
            ..Self::text(field, label, offset)
        }
    }
}

/// A loosely structured section of page text, one cleaned line per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    lines: Vec<String>,
}

impl TextBlock {
    /// Split into lines, clean each, and drop the ones left empty.
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(clean_text)
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The line `offset` positions after the first line starting with `label`.
    pub fn find_line(&self, label: &str, offset: usize) -> Result<&str, FieldError> {
        let j = self
            .lines
            .iter()
            .position(|l| l.starts_with(label))
            .ok_or_else(|| FieldError::LabelNotFound {
                label: label.to_string(),
            })?;
        self.lines
            .get(j + offset)
            .map(|l| l.trim_end())
            .ok_or_else(|| FieldError::OffsetOutOfRange {
                label: label.to_string(),
                offset,
            })
    }

    /// First signed decimal in the resolved line; `Trace` reads as
    /// [`TRACE_AMOUNT`].
    pub fn find_number(&self, label: &str, offset: usize) -> Result<f64, FieldError> {
        let line = self.find_line(label, offset)?;
        if line == "Trace" {
            return Ok(TRACE_AMOUNT);
        }
        NUMBER_RE
            .find(line)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| FieldError::NumberParse {
                label: label.to_string(),
                line: line.to_string(),
            })
    }

    /// `find_line`, logging and swallowing the error.
    pub fn line_or_warn(&self, label: &str, offset: usize) -> Option<String> {
        match self.find_line(label, offset) {
            Ok(line) => Some(line.to_string()),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// `find_number`, logging and swallowing the error.
    pub fn number_or_warn(&self, label: &str, offset: usize) -> Option<f64> {
        match self.find_number(label, offset) {
            Ok(x) => Some(x),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Resolve every spec into `out`; failures leave the field absent.
    pub fn resolve_into(&self, specs: &[FieldSpec], out: &mut Fields) {
        for spec in specs {
            let value = match spec.kind {
                FieldKind::Text => self
                    .line_or_warn(&spec.label, spec.offset)
                    .map(FieldValue::Text),
                FieldKind::Number => self
                    .number_or_warn(&spec.label, spec.offset)
                    .map(FieldValue::Number),
            };
            if let Some(v) = value {
                out.insert(spec.field.clone(), v);
            }
        }
    }
}

/// Resolve `specs` against one section of free text.
pub fn extract_text_block(text: &str, specs: &[FieldSpec]) -> Fields {
    let block = TextBlock::new(text);
    let mut out = Fields::new();
    block.resolve_into(specs, &mut out);
    out
}
