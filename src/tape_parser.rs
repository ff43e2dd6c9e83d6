//! Tape CSV parsing
//!
//! Converts a pasted or exported time-and-sales CSV into [`TapeRecord`]s.
//! Rows keep their input order (newest first for exchange exports).
//!
//! The header only has to *mention* the four required columns; data rows are
//! always read positionally as `date,time,price,volume`. Quoted fields may
//! contain commas (`"230,400"`). Rows that are short, or whose price/volume are
//! not numbers, are dropped without failing the whole tape.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ParseError;
use crate::types::TapeRecord;

const MIN_FIELDS: usize = 4;

/// Accepted header label aliases per required column.
///
/// A column is present when the header line contains any alias as a substring
/// (ASCII case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderLabels {
    pub date: Vec<String>,
    pub time: Vec<String>,
    pub price: Vec<String>,
    pub volume: Vec<String>,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        let labels = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            date: labels(&["日付", "date"]),
            time: labels(&["時間", "時刻", "time"]),
            price: labels(&["約定値", "price"]),
            volume: labels(&["出来高", "volume"]),
        }
    }
}

impl HeaderLabels {
    /// Names of the required columns the header does not mention.
    pub fn missing_from(&self, header: &str) -> Vec<String> {
        let header = header.to_lowercase();
        let columns: [(&str, &[String]); 4] = [
            ("date", &self.date),
            ("time", &self.time),
            ("traded price", &self.price),
            ("volume", &self.volume),
        ];

        columns
            .iter()
            .filter(|(_, aliases)| {
                !aliases
                    .iter()
                    .any(|alias| header.contains(&alias.to_lowercase()))
            })
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

/// Row accounting for a parsed tape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Data rows after the header
    pub rows_seen: usize,
    pub rows_kept: usize,
    pub rows_skipped: usize,
}

/// Parser output: records in input order plus row accounting
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTape {
    pub records: Vec<TapeRecord>,
    pub stats: ParseStats,
}

/// Parse a tape with the default header labels.
pub fn parse(text: &str) -> Result<ParsedTape, ParseError> {
    parse_with_labels(text, &HeaderLabels::default())
}

/// Parse a tape, validating the header against `labels`.
pub fn parse_with_labels(text: &str, labels: &HeaderLabels) -> Result<ParsedTape, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let lines = text.lines().filter(|line| !line.trim().is_empty()).count();
    if lines < 2 {
        return Err(ParseError::TooFewLines { lines });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();

    let header = loop {
        match rows.next() {
            Some(row) => {
                let row = row?;
                if row.iter().any(|field| !field.is_empty()) {
                    break row;
                }
            }
            None => return Err(ParseError::TooFewLines { lines }),
        }
    };

    let header_line = header.iter().collect::<Vec<_>>().join(",");
    let missing = labels.missing_from(&header_line);
    if !missing.is_empty() {
        return Err(ParseError::MissingColumns { missing });
    }

    let mut records = Vec::new();
    let mut stats = ParseStats::default();

    for row in rows {
        let row = row?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }
        stats.rows_seen += 1;
        match parse_row(&row) {
            Some(record) => records.push(record),
            None => stats.rows_skipped += 1,
        }
    }
    stats.rows_kept = records.len();

    debug!(
        rows_seen = stats.rows_seen,
        rows_kept = stats.rows_kept,
        rows_skipped = stats.rows_skipped,
        "parsed tape"
    );

    if records.is_empty() {
        return Err(ParseError::NoValidRows);
    }

    Ok(ParsedTape { records, stats })
}

fn parse_row(row: &StringRecord) -> Option<TapeRecord> {
    if row.len() < MIN_FIELDS {
        return None;
    }

    let price_raw = row.get(2)?;
    let price = parse_finite(price_raw)?;

    let volume_raw: String = row
        .get(3)?
        .chars()
        .filter(|c| *c != '"' && *c != ',')
        .collect();
    let volume = parse_finite(volume_raw.trim())?;

    Some(TapeRecord {
        date: row.get(0)?.to_string(),
        time: row.get(1)?.to_string(),
        price,
        volume,
        price_decimal_places: decimal_places(price_raw),
        millisecond: None,
    })
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Digits after the decimal point in the raw price text, 0 if integral.
pub fn decimal_places(raw: &str) -> u32 {
    raw.split_once('.')
        .map(|(_, fraction)| fraction.chars().filter(char::is_ascii_digit).count() as u32)
        .unwrap_or(0)
}
