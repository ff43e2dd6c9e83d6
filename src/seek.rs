//! Virtual clock arithmetic
//!
//! The scrubber position `seek ∈ [0, 100]` is the only stored notion of "now".
//! It maps onto the bar series by fractional index: `(n - 1) * seek / 100`.
//! The integer part picks a bar, the fraction interpolates linearly towards
//! the next bar's timestamp. [`seek_from_timestamp`] is the exact inverse.
//!
//! Bars are not evenly spaced in time (gaps, the lunch break), so equal seek
//! distances do not mean equal time distances.

use chrono::{NaiveTime, Timelike};

use crate::types::{MILLIS_PER_SECOND, OneMinuteBar, SECONDS_PER_DAY, VirtualTime};

pub const SEEK_MIN: f64 = 0.0;
pub const SEEK_MAX: f64 = 100.0;

/// Clamp into `[0, 100]`. NaN collapses to the start.
pub fn clamp_seek(seek: f64) -> f64 {
    if seek.is_nan() {
        SEEK_MIN
    } else {
        seek.clamp(SEEK_MIN, SEEK_MAX)
    }
}

/// Fractional bar index for a seek value.
pub fn index_from_seek(seek: f64, bar_count: usize) -> f64 {
    if bar_count == 0 {
        return 0.0;
    }
    (bar_count - 1) as f64 * clamp_seek(seek) / SEEK_MAX
}

/// Continuous clock position for a seek value, `None` without bars.
pub fn timestamp_from_seek(seek: f64, bars: &[OneMinuteBar]) -> Option<VirtualTime> {
    let first = bars.first()?;
    let last = bars.last()?;
    if bars.len() == 1 {
        return Some(VirtualTime::from_secs(first.time));
    }

    let position = index_from_seek(seek, bars.len());
    let index = position.floor() as usize;
    if index >= bars.len() - 1 {
        return Some(VirtualTime::from_secs(last.time));
    }

    let fraction = position - index as f64;
    let from = bar_millis(&bars[index]);
    let to = bar_millis(&bars[index + 1]);
    Some(VirtualTime::from_millis(snap_to_whole_millis(
        from + (to - from) * fraction,
    )))
}

/// Round away error within a microsecond picked up in the seek round trip, so a
/// clock set to a whole millisecond reads back as that millisecond.
fn snap_to_whole_millis(millis: f64) -> f64 {
    let nearest = millis.round();
    if (millis - nearest).abs() < 1e-3 {
        nearest
    } else {
        millis
    }
}

/// Seek value for a clock position, `None` without bars.
///
/// Positions at or before the first bar map to 0, at or after the last to 100.
/// A single-bar series maps everything up to its timestamp to 0, later to 100.
pub fn seek_from_timestamp(time: VirtualTime, bars: &[OneMinuteBar]) -> Option<f64> {
    let first = bar_millis(bars.first()?);
    let last = bar_millis(bars.last()?);
    let t = time.as_millis();

    if t <= first {
        return Some(SEEK_MIN);
    }
    if t >= last {
        return Some(SEEK_MAX);
    }

    // first < t < last, so at least two bars and index + 1 is in range
    let index = bars.partition_point(|bar| bar_millis(bar) <= t) - 1;
    let from = bar_millis(&bars[index]);
    let to = bar_millis(&bars[index + 1]);
    let span = to - from;
    let fraction = if span > 0.0 { (t - from) / span } else { 0.0 };

    let seek = (index as f64 + fraction) / (bars.len() - 1) as f64 * SEEK_MAX;
    Some(clamp_seek(seek))
}

fn bar_millis(bar: &OneMinuteBar) -> f64 {
    (bar.time * MILLIS_PER_SECOND) as f64
}

/// Snap to the start of the current minute.
pub fn reset_seconds(time: VirtualTime) -> VirtualTime {
    VirtualTime::from_secs(time.minute_start())
}

/// Snap to the start of the current second.
pub fn reset_sub_seconds(time: VirtualTime) -> VirtualTime {
    VirtualTime::from_secs(time.whole_second())
}

/// Direction of clock travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }
}

/// Daily non-trading window `[start, end)` that the clock never rests in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LunchBreak {
    start_secs: u32,
    end_secs: u32,
}

impl Default for LunchBreak {
    fn default() -> Self {
        // 11:30:00 - 12:30:00
        Self {
            start_secs: 11 * 3600 + 30 * 60,
            end_secs: 12 * 3600 + 30 * 60,
        }
    }
}

impl LunchBreak {
    /// `None` unless `start < end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then(|| Self {
            start_secs: start.num_seconds_from_midnight(),
            end_secs: end.num_seconds_from_midnight(),
        })
    }

    pub fn contains(&self, time: VirtualTime) -> bool {
        let of_day = millis_of_day(time);
        of_day >= self.start_millis() && of_day < self.end_millis()
    }

    /// Move a clock position out of the window in the direction of travel:
    /// forward lands on `end`, backward on one second before `start`.
    /// Positions outside the window are returned unchanged.
    pub fn skip(&self, time: VirtualTime, direction: Direction) -> VirtualTime {
        if !self.contains(time) {
            return time;
        }

        let day_start = time.floor_millis() - millis_of_day(time);
        let target = match direction {
            Direction::Forward => day_start + self.end_millis(),
            Direction::Backward => day_start + self.start_millis() - MILLIS_PER_SECOND,
        };
        VirtualTime::from_millis(target as f64)
    }

    fn start_millis(&self) -> i64 {
        i64::from(self.start_secs) * MILLIS_PER_SECOND
    }

    fn end_millis(&self) -> i64 {
        i64::from(self.end_secs) * MILLIS_PER_SECOND
    }
}

fn millis_of_day(time: VirtualTime) -> i64 {
    time.floor_millis().rem_euclid(SECONDS_PER_DAY * MILLIS_PER_SECOND)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-12-05T09:00:00Z
    const NINE: i64 = 1_764_925_200;

    fn bars(times: &[i64]) -> Vec<OneMinuteBar> {
        times
            .iter()
            .map(|&t| OneMinuteBar::opened_at(t, 100.0))
            .collect()
    }

    fn at(hour: i64, minute: i64, second: i64) -> VirtualTime {
        VirtualTime::from_secs(NINE + (hour - 9) * 3600 + minute * 60 + second)
    }

    #[test]
    fn test_endpoints_hit_bar_times_exactly() {
        let series = bars(&[NINE, NINE + 60, NINE + 180]);
        assert_eq!(
            timestamp_from_seek(0.0, &series),
            Some(VirtualTime::from_secs(NINE))
        );
        assert_eq!(
            timestamp_from_seek(100.0, &series),
            Some(VirtualTime::from_secs(NINE + 180))
        );
        assert_eq!(
            timestamp_from_seek(50.0, &series),
            Some(VirtualTime::from_secs(NINE + 60))
        );
    }

    #[test]
    fn test_interpolates_between_bars() {
        let series = bars(&[NINE, NINE + 60, NINE + 180]);
        // index 1.5 -> halfway between +60 and +180
        let t = timestamp_from_seek(75.0, &series).unwrap();
        assert_eq!(t, VirtualTime::from_secs(NINE + 120));
        assert_eq!(index_from_seek(75.0, series.len()), 1.5);
    }

    #[test]
    fn test_inverse_round_trip() {
        let series = bars(&[NINE, NINE + 60, NINE + 180, NINE + 240]);
        for seek in [0.0, 12.5, 33.3, 50.0, 66.6, 99.9, 100.0] {
            let t = timestamp_from_seek(seek, &series).unwrap();
            let back = seek_from_timestamp(t, &series).unwrap();
            assert!((back - seek).abs() < 1e-5, "{seek} -> {back}");
        }
    }

    #[test]
    fn test_whole_millisecond_positions_read_back_exactly() {
        let series = bars(&[NINE, NINE + 60, NINE + 180, NINE + 3_660]);
        for offset_ms in [1, 999, 75_400, 61_001, 3_000_123] {
            let t = VirtualTime::from_millis((NINE * 1000 + offset_ms) as f64);
            let seek = seek_from_timestamp(t, &series).unwrap();
            assert_eq!(timestamp_from_seek(seek, &series), Some(t));
        }
    }

    #[test]
    fn test_clamps_outside_series() {
        let series = bars(&[NINE, NINE + 60]);
        assert_eq!(
            seek_from_timestamp(VirtualTime::from_secs(NINE - 10), &series),
            Some(0.0)
        );
        assert_eq!(
            seek_from_timestamp(VirtualTime::from_secs(NINE + 600), &series),
            Some(100.0)
        );
        assert_eq!(
            timestamp_from_seek(250.0, &series),
            Some(VirtualTime::from_secs(NINE + 60))
        );
    }

    #[test]
    fn test_single_bar_series() {
        let series = bars(&[NINE]);
        assert_eq!(
            timestamp_from_seek(42.0, &series),
            Some(VirtualTime::from_secs(NINE))
        );
        assert_eq!(
            seek_from_timestamp(VirtualTime::from_secs(NINE), &series),
            Some(0.0)
        );
        assert_eq!(
            seek_from_timestamp(VirtualTime::from_secs(NINE + 1), &series),
            Some(100.0)
        );
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(timestamp_from_seek(50.0, &[]), None);
        assert_eq!(seek_from_timestamp(VirtualTime::from_secs(0), &[]), None);
        assert_eq!(index_from_seek(50.0, 0), 0.0);
    }

    #[test]
    fn test_lunch_skip_forward_and_backward() {
        let lunch = LunchBreak::default();
        assert_eq!(lunch.skip(at(11, 45, 0), Direction::Forward), at(12, 30, 0));
        assert_eq!(lunch.skip(at(11, 45, 0), Direction::Backward), at(11, 29, 59));
        assert_eq!(lunch.skip(at(11, 30, 0), Direction::Forward), at(12, 30, 0));
        // Upper bound is exclusive
        assert_eq!(lunch.skip(at(12, 30, 0), Direction::Backward), at(12, 30, 0));
        assert_eq!(lunch.skip(at(11, 29, 59), Direction::Forward), at(11, 29, 59));
    }

    #[test]
    fn test_lunch_skip_is_idempotent() {
        let lunch = LunchBreak::default();
        for direction in [Direction::Forward, Direction::Backward] {
            let once = lunch.skip(at(12, 0, 0).plus_millis(250.0), direction);
            assert_eq!(lunch.skip(once, direction), once);
        }
    }

    #[test]
    fn test_resets() {
        let t = at(10, 15, 42).plus_millis(730.0);
        assert_eq!(reset_seconds(t), at(10, 15, 0));
        assert_eq!(reset_sub_seconds(t), at(10, 15, 42));
    }

    #[test]
    fn test_lunch_break_from_times() {
        let start = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let lunch = LunchBreak::new(start, end).unwrap();
        assert!(lunch.contains(at(11, 59, 59)));
        assert!(!lunch.contains(at(12, 0, 0)));
        assert!(LunchBreak::new(end, start).is_none());
    }

    #[test]
    fn test_clamp_seek() {
        assert_eq!(clamp_seek(f64::NAN), 0.0);
        assert_eq!(clamp_seek(-3.0), 0.0);
        assert_eq!(clamp_seek(130.0), 100.0);
        assert_eq!(clamp_seek(42.5), 42.5);
    }
}
