//! Core data model: tape records, one-minute bars, and the virtual clock instant

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A single trade print from the tape.
///
/// Tape timestamps are exchange-local wall clock values. They are never shifted
/// into another timezone: the literal `Y/M/D H:M:S` fields are read as if they
/// were UTC fields, so downstream displays show the tape's own clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapeRecord {
    /// `YYYY/MM/DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    pub price: f64,
    pub volume: f64,
    /// Digits after the decimal point in the raw price text
    pub price_decimal_places: u32,
    /// Synthetic sub-second offset in `[0, 999]`, set by the disambiguator
    pub millisecond: Option<u16>,
}

impl TapeRecord {
    /// Parse `date` and `time` into calendar fields.
    ///
    /// Returns `None` when any component is not an integer or the resulting
    /// date/time does not exist (e.g. `2025/02/30`).
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let (year, month, day) = parse_date_fields(&self.date)?;
        let (hour, minute, second) = parse_time_fields(&self.time)?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;
        Some(NaiveDateTime::new(date, time))
    }

    /// Whole-second Unix timestamp with the tape's fields taken as UTC.
    pub fn timestamp(&self) -> Option<i64> {
        self.datetime().map(|dt| dt.and_utc().timestamp())
    }

    /// Start of the minute bucket this record belongs to.
    pub fn minute_bucket(&self) -> Option<i64> {
        self.timestamp().map(minute_floor)
    }

    /// Whole-second timestamp plus the synthetic millisecond (0 when unset).
    pub fn effective_millis(&self) -> Option<i64> {
        self.timestamp()
            .map(|secs| secs * MILLIS_PER_SECOND + i64::from(self.millisecond.unwrap_or(0)))
    }
}

/// Split `YYYY/MM/DD` into integer fields.
pub(crate) fn parse_date_fields(date: &str) -> Option<(i32, u32, u32)> {
    let mut parts = date.trim().split('/');
    let year = parts.next()?.trim().parse().ok()?;
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((year, month, day))
}

/// Split `HH:MM:SS` into integer fields.
pub(crate) fn parse_time_fields(time: &str) -> Option<(u32, u32, u32)> {
    let mut parts = time.trim().split(':');
    let hour = parts.next()?.trim().parse().ok()?;
    let minute = parts.next()?.trim().parse().ok()?;
    let second = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((hour, minute, second))
}

/// Truncate a Unix-seconds timestamp to the start of its minute.
pub fn minute_floor(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(SECONDS_PER_MINUTE)
}

/// Optional per-bar color overrides consumed by the chart widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarColors {
    pub color: String,
    pub border_color: String,
    pub wick_color: String,
}

/// One-minute OHLC bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneMinuteBar {
    /// Unix seconds, minute aligned
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(flatten)]
    pub colors: Option<BarColors>,
}

impl OneMinuteBar {
    /// Start a bar from its first print.
    pub fn opened_at(time: i64, price: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            colors: None,
        }
    }

    /// Fold a later print into the bar.
    pub fn absorb(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    pub fn is_up(&self) -> bool {
        self.close > self.open
    }
}

/// First and last bar timestamps of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}

impl TimeRange {
    pub fn of(bars: &[OneMinuteBar]) -> Option<Self> {
        Some(Self {
            min: bars.first()?.time,
            max: bars.last()?.time,
        })
    }
}

/// A point on the virtual clock, in milliseconds since the Unix epoch.
///
/// Interpolation between bar timestamps yields fractional milliseconds, so the
/// value is kept as `f64`; the whole-second and sub-second views floor it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct VirtualTime(f64);

impl VirtualTime {
    pub fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: i64) -> Self {
        Self((secs * MILLIS_PER_SECOND) as f64)
    }

    pub fn as_millis(self) -> f64 {
        self.0
    }

    /// Floor of the instant, in whole milliseconds.
    pub fn floor_millis(self) -> i64 {
        self.0.floor() as i64
    }

    pub fn whole_second(self) -> i64 {
        self.floor_millis().div_euclid(MILLIS_PER_SECOND)
    }

    /// Milliseconds elapsed within the current second, `[0, 999]`.
    pub fn sub_second_millis(self) -> u32 {
        self.floor_millis().rem_euclid(MILLIS_PER_SECOND) as u32
    }

    pub fn minute_start(self) -> i64 {
        minute_floor(self.whole_second())
    }

    /// Seconds elapsed within the current minute, `[0, 59]`.
    pub fn second_of_minute(self) -> u32 {
        self.whole_second().rem_euclid(SECONDS_PER_MINUTE) as u32
    }

    /// True when the clock sits exactly on a minute boundary.
    pub fn is_minute_boundary(self) -> bool {
        self.second_of_minute() == 0 && self.sub_second_millis() == 0
    }

    pub fn plus_millis(self, millis: f64) -> Self {
        Self(self.0 + millis)
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.floor_millis())
    }

    /// `HH:MM:SS.mmm` of the tape clock.
    pub fn clock_label(self) -> String {
        match self.to_datetime() {
            Some(dt) => format!(
                "{:02}:{:02}:{:02}.{:03}",
                dt.hour(),
                dt.minute(),
                dt.second(),
                self.sub_second_millis()
            ),
            None => "--:--:--.---".to_string(),
        }
    }
}
