// src/store/dataset.rs

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::Builder;
use tracing::{info, instrument};

use super::merge::{merge, split_by_year};
use super::types::{Record, RecordSet};

/// Per (entity, year) CSV files under `{data_dir}/{year}/`.
///
/// The first CSV column is the time index; every value is kept as text.
pub struct DatasetStore {
    data_dir: PathBuf,
    /// File name with a `{code}` placeholder for the entity code.
    file_template: String,
}

impl DatasetStore {
    pub fn new(data_dir: impl Into<PathBuf>, file_template: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_template: file_template.into(),
        }
    }

    pub fn path(&self, code: &str, year: i32) -> PathBuf {
        self.data_dir
            .join(format!("{}", year))
            .join(self.file_template.replace("{code}", code))
    }

    /// Read the dataset for `code` in `year`, `None` if there is no file yet.
    pub fn load(&self, code: &str, year: i32) -> Result<Option<RecordSet>> {
        let path = self.path(code, year);
        if !path.exists() {
            return Ok(None);
        }
        read_csv(&path).map(Some)
    }

    /// Write `set` for `code`, replacing any existing file. All keys must fall
    /// in one calendar year.
    pub fn save(&self, code: &str, set: &RecordSet) -> Result<PathBuf> {
        let mut years = set.records.iter().map(|r| r.year());
        let year = match years.next() {
            Some(year) => year?,
            None => bail!("refusing to save an empty dataset for {}", code),
        };
        for other in years {
            let other = other?;
            if other != year {
                bail!("dataset for {} spans years {} and {}", code, year, other);
            }
        }
        let path = self.path(code, year);
        write_csv(&path, set)?;
        Ok(path)
    }

    /// Merge `new` into the stored data, one file per calendar year it covers.
    /// Returns the paths written.
    #[instrument(level = "info", skip(self, new), fields(rows = new.len()))]
    pub fn merge_and_save(&self, code: &str, new: RecordSet) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (year, part) in split_by_year(new)? {
            let path = self.path(code, year);
            let existing = self.load(code, year)?;
            if let Some(old) = &existing {
                info!("Existing file found");
                if old.time_label != part.time_label {
                    bail!(
                        "{} is indexed by `{}`, expected `{}`",
                        path.display(),
                        old.time_label,
                        part.time_label
                    );
                }
            }
            let is_merge = existing.is_some();
            let merged = merge(existing, part)
                .with_context(|| format!("merging into {}", path.display()))?;
            write_csv(&path, &merged)?;
            if is_merge {
                info!("Data merged and saved to {}", path.display());
            } else {
                info!("Data saved to {}", path.display());
            }
            written.push(path);
        }
        Ok(written)
    }
}

pub fn read_csv(path: &Path) -> Result<RecordSet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();
    let mut fields = headers.iter().map(str::to_string);
    let time_label = match fields.next() {
        Some(label) => label,
        None => bail!("{} has no header row", path.display()),
    };
    let mut set = RecordSet::new(time_label, fields.collect());

    for (idx, result) in rdr.records().enumerate() {
        let row = result
            .with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        let mut values = row.iter().map(str::to_string);
        let timestamp = values.next().unwrap_or_default();
        set.records.push(Record::new(timestamp, values.collect()));
    }
    set.sort();
    Ok(set)
}

/// Write to a temporary sibling then rename over `path`. The temporary file
/// is removed if any step fails.
pub fn write_csv(path: &Path, set: &RecordSet) -> Result<()> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut tmp = Builder::new()
        .prefix(&format!(".{}", file_name))
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    let tmp_path = tmp.path().to_path_buf();
    {
        let mut wtr = WriterBuilder::new().from_writer(tmp.as_file_mut());
        wtr.write_record(set.header())?;
        for record in &set.records {
            wtr.write_record(std::iter::once(&record.timestamp).chain(record.values.iter()))?;
        }
        wtr.flush()
            .with_context(|| format!("writing {}", tmp_path.display()))?;
    }

    tmp.persist(path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    Ok(())
}
