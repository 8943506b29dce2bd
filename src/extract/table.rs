// src/extract/table.rs

use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Html};
use tracing::{debug, info, instrument};

use super::{child_elements, clean_text, element_text, has_class, leading_text, select_unique};
use crate::error::ScrapeError;
use crate::store::types::{Record, RecordSet, TIMESTAMP_FORMAT};

/// Formats accepted for date-header rows, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%A, %d %B %Y",
    "%A %d %B %Y",
    "%d %B %Y",
    "%A, %B %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%Y-%m-%d",
];

/// Everything the table extractor needs to know about the page layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table_id: String,
    /// The first retained heading starting with this is the time column.
    pub time_column_prefix: String,
    /// Suffix on header ids / cell `headers` refs that marks imperial duplicates.
    pub imperial_marker: String,
    /// Cell class that marks an imperial duplicate.
    pub imperial_class: String,
    /// Class of the single `th` in a date-header row.
    pub date_class: String,
    /// Value stored for empty cells.
    pub missing: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
    Imperial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub label: String,
    pub unit: UnitSystem,
    /// Position among all header cells, imperial ones included.
    pub position: usize,
}

/// Parsed `thead`: every heading cell tagged with its unit system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub columns: Vec<Column>,
    /// Index of the time column among the retained (metric) columns.
    pub time_index: usize,
}

impl Header {
    pub fn retained(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.unit == UnitSystem::Metric)
    }

    pub fn labels(&self) -> Vec<String> {
        self.retained().map(|c| c.label.clone()).collect()
    }

    pub fn width(&self) -> usize {
        self.retained().count()
    }
}

impl TableSpec {
    fn header_unit(&self, th: ElementRef<'_>) -> UnitSystem {
        match th.value().attr("id") {
            Some(id) if id.ends_with(&self.imperial_marker) => UnitSystem::Imperial,
            _ => UnitSystem::Metric,
        }
    }

    fn cell_unit(&self, td: ElementRef<'_>) -> UnitSystem {
        let by_ref = td
            .value()
            .attr("headers")
            .map(|h| h.ends_with(&self.imperial_marker))
            .unwrap_or(false);
        if by_ref || has_class(td, &self.imperial_class) {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }
}

/// Parse the table with id `spec.table_id` into a time-indexed record set.
///
/// `today` seeds the date context for rows that precede the first
/// date-header row.
#[instrument(level = "info", skip(doc, spec), fields(table = %spec.table_id))]
pub fn extract_table(
    doc: &Html,
    spec: &TableSpec,
    today: NaiveDate,
) -> Result<RecordSet, ScrapeError> {
    let table = select_unique(doc, "table", &spec.table_id)?;
    info!("Reading data from {} table...", spec.table_id);

    let header = parse_header(table, spec)?;
    let labels = header.labels();
    let time_label = labels[header.time_index].clone();
    let columns: Vec<String> = labels
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != header.time_index)
        .map(|(_, l)| l.clone())
        .collect();

    let tbody = first_child(table, "tbody", spec)?;
    let rows: Vec<ElementRef<'_>> = child_elements(tbody, "tr").collect();
    info!("Table has {} rows.", rows.len());

    let mut set = RecordSet::new(time_label, columns);
    let mut date = today;
    for (i, row) in rows.into_iter().enumerate() {
        let ths: Vec<_> = child_elements(row, "th").collect();
        if ths.len() == 1 && has_class(ths[0], &spec.date_class) {
            date = parse_date(&element_text(ths[0], ""), spec)?;
            debug!("{:3}: Date {}", i, date);
            continue;
        }

        let tds: Vec<_> = child_elements(row, "td").collect();
        if tds.is_empty() {
            continue;
        }
        let mut values: Vec<String> = tds
            .into_iter()
            .filter(|td| spec.cell_unit(*td) == UnitSystem::Metric)
            .map(|td| element_text(td, &spec.missing))
            .collect();
        if values.len() != header.width() {
            return Err(ScrapeError::RowShape {
                table_id: spec.table_id.clone(),
                row: i,
                expected: header.width(),
                found: values.len(),
            });
        }
        debug!("{:3}: {:?}", i, values);

        let clock = values.remove(header.time_index);
        let time = NaiveTime::parse_from_str(&clock, "%H:%M").map_err(|_| {
            ScrapeError::ClockTime {
                table_id: spec.table_id.clone(),
                row: i,
                text: clock.clone(),
            }
        })?;
        let timestamp = date.and_time(time).format(TIMESTAMP_FORMAT).to_string();
        set.records.push(Record::new(timestamp, values));
    }

    set.sort();
    Ok(set)
}

/// Tag every `thead > tr > th` with its unit system and derive labels for the
/// metric ones.
pub fn parse_header(table: ElementRef<'_>, spec: &TableSpec) -> Result<Header, ScrapeError> {
    let thead = first_child(table, "thead", spec)?;
    let cells = child_elements(thead, "tr").flat_map(|tr| child_elements(tr, "th"));

    info!("Table headings:");
    let mut columns = Vec::new();
    let mut retained = 0usize;
    let mut time_index = None;
    for (position, th) in cells.enumerate() {
        let unit = spec.header_unit(th);
        let mut label = heading_label(th);
        if unit == UnitSystem::Metric {
            if label.is_empty() {
                label = format!("Header{}", retained);
            }
            info!("{:2}: '{}'", retained, label);
            if time_index.is_none() && label.starts_with(&spec.time_column_prefix) {
                time_index = Some(retained);
            }
            retained += 1;
        }
        columns.push(Column {
            label,
            unit,
            position,
        });
    }

    let time_index = time_index.ok_or_else(|| ScrapeError::MissingTimeColumn {
        table_id: spec.table_id.clone(),
        prefix: spec.time_column_prefix.clone(),
    })?;
    Ok(Header {
        columns,
        time_index,
    })
}

/// The cell's own leading text followed by each child element's leading
/// text, single-space joined with empty fragments skipped.
fn heading_label(th: ElementRef<'_>) -> String {
    std::iter::once(leading_text(th))
        .chain(th.children().filter_map(ElementRef::wrap).map(leading_text))
        .map(|s| clean_text(&s))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_child<'a>(
    el: ElementRef<'a>,
    name: &'a str,
    spec: &TableSpec,
) -> Result<ElementRef<'a>, ScrapeError> {
    child_elements(el, name)
        .next()
        .ok_or_else(|| ScrapeError::Structure {
            selector: format!("table[id=\"{}\"] > {}", spec.table_id, name),
            found: 0,
        })
}

fn parse_date(text: &str, spec: &TableSpec) -> Result<NaiveDate, ScrapeError> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .ok_or_else(|| ScrapeError::DateContext {
            table_id: spec.table_id.clone(),
            text: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,wxscrape::extract=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn spec() -> TableSpec {
        TableSpec {
            table_id: "past24Table".into(),
            time_column_prefix: "Date / Time".into(),
            imperial_marker: "i".into(),
            imperial_class: "imperial".into(),
            date_class: "table-date".into(),
            missing: "Missing".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
    }

    const PAST_24: &str = r#"<html><head><title>Past 24 hour conditions</title></head><body>
<table id="past24Table" class="table">
  <thead>
    <tr>
      <th id="th1m">Date / Time<br><abbr title="Pacific Standard Time">PST</abbr></th>
      <th id="th1i">Date / Time<br><abbr>PDT</abbr></th>
      <th id="th2m">Conditions</th>
      <th id="th3m">Temperature <abbr>(°C)</abbr></th>
      <th id="th3i">Temperature <abbr>(°F)</abbr></th>
      <th id="th4m"><span class="wb-inv"></span></th>
    </tr>
  </thead>
  <tbody>
    <tr><th colspan="6" class="wxo-th-bkg table-date">1 March 2024</th></tr>
    <tr>
      <td headers="th1m">23:00</td>
      <td headers="th1i">23:00</td>
      <td headers="th2m">Mostly   Cloudy
      </td>
      <td headers="th3m" class="metric">5.2</td>
      <td headers="th3m" class="imperial">41.4</td>
      <td headers="th4m"></td>
    </tr>
    <tr><th colspan="6" class="wxo-th-bkg table-date">2 March 2024</th></tr>
    <tr>
      <td headers="th1m">01:00</td>
      <td headers="th1i">01:00</td>
      <td headers="th2m">Rain</td>
      <td headers="th3m">4.8</td>
      <td headers="th3i">40.6</td>
      <td headers="th4m">x</td>
    </tr>
    <tr>
      <td headers="th1m">00:00</td>
      <td headers="th1i">00:00</td>
      <td headers="th2m">Cloudy</td>
      <td headers="th3m">5.0</td>
      <td headers="th3i">41.0</td>
      <td headers="th4m">y</td>
    </tr>
  </tbody>
</table></body></html>"#;

    #[test]
    fn test_extract_past_24_table() {
        init_test_logging();
        let doc = Html::parse_document(PAST_24);
        let set = extract_table(&doc, &spec(), today()).unwrap();

        assert_eq!(set.time_label, "Date / Time PST");
        assert_eq!(set.columns, vec!["Conditions", "Temperature (°C)", "Header3"]);
        assert_eq!(
            set.timestamps(),
            vec!["2024-03-01 23:00", "2024-03-02 00:00", "2024-03-02 01:00"]
        );
        assert_eq!(set.get(0, "Conditions"), Some("Mostly Cloudy"));
        assert_eq!(set.get(0, "Temperature (°C)"), Some("5.2"));
        assert_eq!(set.get(0, "Header3"), Some("Missing"));
        assert_eq!(set.get(2, "Header3"), Some("x"));
    }

    #[test]
    fn test_header_drops_imperial_columns() {
        let html = r#"<table id="past24Table"><thead><tr>
            <th id="th1m">Date / Time PST</th>
            <th id="th1i">Date / Time PDT</th>
            <th id="th2m">Temp</th>
        </tr></thead><tbody></tbody></table>"#;
        let doc = Html::parse_document(html);
        let table = select_unique(&doc, "table", "past24Table").unwrap();
        let header = parse_header(table, &spec()).unwrap();

        assert_eq!(header.labels(), vec!["Date / Time PST", "Temp"]);
        assert_eq!(header.time_index, 0);
        assert_eq!(header.columns.len(), 3);
        assert_eq!(header.columns[1].unit, UnitSystem::Imperial);
        assert_eq!(header.columns[2].position, 2);
    }

    #[test]
    fn test_only_metric_headers_survive() {
        let html = r#"<table id="t"><thead><tr>
            <th id="ai">a</th><th id="bi">b</th><th id="cm">Date / Time</th>
            <th id="di">d</th><th id="em">e</th>
        </tr></thead></table>"#;
        let doc = Html::parse_document(html);
        let table = select_unique(&doc, "table", "t").unwrap();
        let header = parse_header(table, &spec()).unwrap();
        assert_eq!(header.width(), 2);
    }

    #[test]
    fn test_first_matching_time_column_wins() {
        let html = r#"<table id="t"><thead><tr>
            <th id="am">Temp</th><th id="bm">Date / Time UTC</th><th id="cm">Date / Time PST</th>
        </tr></thead></table>"#;
        let doc = Html::parse_document(html);
        let table = select_unique(&doc, "table", "t").unwrap();
        assert_eq!(parse_header(table, &spec()).unwrap().time_index, 1);
    }

    #[test]
    fn test_missing_time_column() {
        let html = r#"<table id="past24Table"><thead><tr><th id="am">Temp</th></tr></thead>
            <tbody><tr><td headers="am">1</td></tr></tbody></table>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_table(&doc, &spec(), today()).unwrap_err(),
            ScrapeError::MissingTimeColumn {
                table_id: "past24Table".into(),
                prefix: "Date / Time".into()
            }
        );
    }

    #[test]
    fn test_table_must_be_unique() {
        let doc = Html::parse_document("<p>no table here</p>");
        let err = extract_table(&doc, &spec(), today()).unwrap_err();
        assert!(err.to_string().contains("past24Table"));

        let two = r#"<table id="past24Table"></table><table id="past24Table"></table>"#;
        let doc = Html::parse_document(two);
        assert!(matches!(
            extract_table(&doc, &spec(), today()),
            Err(ScrapeError::Structure { found: 2, .. })
        ));
    }

    #[test]
    fn test_row_shape_mismatch_is_fatal() {
        let html = r#"<table id="past24Table"><thead><tr>
            <th id="th1m">Date / Time PST</th><th id="th2m">Temp</th>
        </tr></thead><tbody>
            <tr><td headers="th1m">10:00</td></tr>
        </tbody></table>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_table(&doc, &spec(), today()).unwrap_err(),
            ScrapeError::RowShape {
                table_id: "past24Table".into(),
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rows_before_first_date_use_today() {
        let html = r#"<table id="past24Table"><thead><tr>
            <th id="th1m">Date / Time PST</th><th id="th2m">Temp</th>
        </tr></thead><tbody>
            <tr><td headers="th1m">10:00</td><td headers="th2m">3</td></tr>
        </tbody></table>"#;
        let doc = Html::parse_document(html);
        let set = extract_table(&doc, &spec(), today()).unwrap();
        assert_eq!(set.timestamps(), vec!["2024-03-02 10:00"]);
    }

    #[test]
    fn test_bad_clock_time() {
        let html = r#"<table id="past24Table"><thead><tr>
            <th id="th1m">Date / Time PST</th>
        </tr></thead><tbody>
            <tr><td headers="th1m">noon</td></tr>
        </tbody></table>"#;
        let doc = Html::parse_document(html);
        assert!(matches!(
            extract_table(&doc, &spec(), today()),
            Err(ScrapeError::ClockTime { row: 0, .. })
        ));
    }

    #[test]
    fn test_date_header_formats() {
        let s = spec();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        for text in ["1 March 2024", "Friday, 1 March 2024", "March 1, 2024", "2024-03-01"] {
            assert_eq!(parse_date(text, &s).unwrap(), expected, "{}", text);
        }
        assert!(parse_date("yesterday", &s).is_err());
    }
}
