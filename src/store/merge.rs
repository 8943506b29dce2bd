// src/store/merge.rs

use std::collections::BTreeMap;
use tracing::debug;

use super::types::RecordSet;
use crate::error::ScrapeError;

/// Merge a freshly scraped set into an existing dataset.
///
/// - No existing dataset: `new` sorted by time key.
/// - Otherwise: the existing rows strictly earlier than `new`'s earliest key,
///   followed by `new`, re-sorted.
///
/// Existing rows at or after the new span's start are dropped, never
/// deduplicated; any repeated key in the result is a `DuplicateTimestamp`.
pub fn merge(existing: Option<RecordSet>, new: RecordSet) -> Result<RecordSet, ScrapeError> {
    let mut merged = match existing {
        None => new,
        Some(mut old) => {
            if old.header() != new.header() {
                return Err(ScrapeError::SchemaMismatch {
                    existing: old.header(),
                    new: new.header(),
                });
            }
            match new.min_timestamp().map(str::to_owned) {
                None => old,
                Some(start) => {
                    let before = old.records.len();
                    old.records.retain(|r| r.timestamp.as_str() < start.as_str());
                    debug!(
                        kept = old.records.len(),
                        dropped = before - old.records.len(),
                        %start,
                        "truncated existing rows"
                    );
                    old.records.extend(new.records);
                    old
                }
            }
        }
    };

    merged.sort();
    if let Some(dup) = merged
        .records
        .windows(2)
        .find(|w| w[0].timestamp == w[1].timestamp)
    {
        return Err(ScrapeError::DuplicateTimestamp {
            timestamp: dup[0].timestamp.clone(),
        });
    }
    Ok(merged)
}

/// Partition a set by the calendar year of each key, so that no persisted
/// dataset spans more than one year.
pub fn split_by_year(set: RecordSet) -> Result<BTreeMap<i32, RecordSet>, ScrapeError> {
    let mut out: BTreeMap<i32, RecordSet> = BTreeMap::new();
    let RecordSet {
        time_label,
        columns,
        records,
    } = set;
    for record in records {
        let year = record.year()?;
        out.entry(year)
            .or_insert_with(|| RecordSet::new(time_label.clone(), columns.clone()))
            .records
            .push(record);
    }
    Ok(out)
}
