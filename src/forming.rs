//! In-progress bar reconstruction
//!
//! The forming bar is rebuilt from raw prints on every clock query, never from
//! the aggregated series. A print belongs to it when it falls in the clock's
//! minute and its effective instant (whole second + synthetic millisecond) is
//! at or before the clock, so a print stamped `.500` appears once the clock
//! reaches `.500` of that second, not before.
//!
//! Nothing is forming exactly on a minute boundary.

use std::cmp::Reverse;

use crate::doji::color_forming_bar;
use crate::styles::ColorScheme;
use crate::types::{MILLIS_PER_SECOND, OneMinuteBar, TapeRecord, VirtualTime};

#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedPrint {
    effective_millis: i64,
    price: f64,
}

/// Prints in chronological order with pre-parsed instants.
///
/// Ties on the effective instant keep tape semantics: the print appearing
/// later in the newest-first input is older and sorts first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickTimeline {
    prints: Vec<TimedPrint>,
}

impl TickTimeline {
    pub fn new(records: &[TapeRecord]) -> Self {
        let mut keyed: Vec<(i64, Reverse<usize>, f64)> = records
            .iter()
            .enumerate()
            .filter_map(|(seq, record)| {
                record
                    .effective_millis()
                    .map(|millis| (millis, Reverse(seq), record.price))
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        Self {
            prints: keyed
                .into_iter()
                .map(|(effective_millis, _, price)| TimedPrint {
                    effective_millis,
                    price,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.prints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prints.is_empty()
    }

    /// The bar accumulating at `now`, `None` on a minute boundary or when no
    /// print of the minute has happened yet.
    pub fn forming_bar(&self, now: VirtualTime) -> Option<OneMinuteBar> {
        if now.is_minute_boundary() {
            return None;
        }

        let bucket = now.minute_start();
        let bucket_millis = bucket * MILLIS_PER_SECOND;
        let now_millis = now.floor_millis();

        let from = self
            .prints
            .partition_point(|p| p.effective_millis < bucket_millis);
        let to = self
            .prints
            .partition_point(|p| p.effective_millis <= now_millis);

        let (first, rest) = self.prints.get(from..to)?.split_first()?;
        let mut bar = OneMinuteBar::opened_at(bucket, first.price);
        for print in rest {
            bar.absorb(print.price);
        }
        Some(bar)
    }
}

/// Forming bar straight from tape records.
///
/// Convenience over [`TickTimeline::forming_bar`] for one-off queries; replay
/// loops should build the timeline once.
pub fn forming_bar(now: VirtualTime, records: &[TapeRecord]) -> Option<OneMinuteBar> {
    TickTimeline::new(records).forming_bar(now)
}

/// Bars that finished before the minute containing `now`.
pub fn completed_before(bars: &[OneMinuteBar], now: VirtualTime) -> &[OneMinuteBar] {
    let minute = now.minute_start();
    let end = bars.partition_point(|bar| bar.time < minute);
    &bars[..end]
}

/// Completed bars followed by the doji-colored forming bar, if any.
pub fn display_series(
    bars: &[OneMinuteBar],
    timeline: &TickTimeline,
    now: VirtualTime,
    scheme: &ColorScheme,
) -> Vec<OneMinuteBar> {
    let completed = completed_before(bars, now);
    let mut series = completed.to_vec();

    if let Some(mut forming) = timeline.forming_bar(now) {
        color_forming_bar(&mut forming, completed, scheme);
        series.push(forming);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-12-05T10:00:00Z
    const TEN: i64 = 1_764_928_800;

    fn tick(time: &str, price: f64, millisecond: u16) -> TapeRecord {
        TapeRecord {
            date: "2025/12/05".to_string(),
            time: time.to_string(),
            price,
            volume: 1.0,
            price_decimal_places: 0,
            millisecond: Some(millisecond),
        }
    }

    fn clock(offset_secs: i64, millis: f64) -> VirtualTime {
        VirtualTime::from_secs(TEN + offset_secs).plus_millis(millis)
    }

    fn ohlc(bar: &OneMinuteBar) -> (f64, f64, f64, f64) {
        (bar.open, bar.high, bar.low, bar.close)
    }

    #[test]
    fn test_single_tick_forming_bar() {
        let ticks = vec![tick("10:00:00", 250.0, 0)];
        let bar = forming_bar(clock(30, 0.0), &ticks).unwrap();
        assert_eq!(bar.time, TEN);
        assert_eq!(ohlc(&bar), (250.0, 250.0, 250.0, 250.0));
    }

    #[test]
    fn test_minute_boundary_has_no_forming_bar() {
        let ticks = vec![tick("10:00:00", 250.0, 0)];
        assert_eq!(forming_bar(clock(0, 0.0), &ticks), None);
        // Any elapsed time inside the minute counts
        assert!(forming_bar(clock(0, 1.0), &ticks).is_some());
    }

    #[test]
    fn test_millisecond_boundary_is_inclusive() {
        // Newest first; same second spread to 500 / 0
        let ticks = vec![tick("10:00:05", 11.0, 500), tick("10:00:05", 10.0, 0)];

        let before = forming_bar(clock(5, 499.0), &ticks).unwrap();
        assert_eq!(ohlc(&before), (10.0, 10.0, 10.0, 10.0));

        let exact = forming_bar(clock(5, 500.0), &ticks).unwrap();
        assert_eq!(ohlc(&exact), (10.0, 11.0, 10.0, 11.0));
    }

    #[test]
    fn test_earlier_seconds_included_regardless_of_millisecond() {
        let ticks = vec![tick("10:00:04", 12.0, 900), tick("10:00:02", 9.0, 0)];
        let bar = forming_bar(clock(5, 0.0), &ticks).unwrap();
        assert_eq!(ohlc(&bar), (9.0, 12.0, 9.0, 12.0));
    }

    #[test]
    fn test_other_minutes_and_future_ticks_excluded() {
        let ticks = vec![
            tick("10:01:00", 99.0, 0),
            tick("10:00:40", 50.0, 0),
            tick("10:00:10", 20.0, 0),
            tick("09:59:59", 1.0, 0),
        ];
        let bar = forming_bar(clock(20, 0.0), &ticks).unwrap();
        assert_eq!(ohlc(&bar), (20.0, 20.0, 20.0, 20.0));

        // Minute with no prints yet
        assert_eq!(forming_bar(clock(65, 0.0), &[tick("10:01:30", 1.0, 0)]), None);
    }

    #[test]
    fn test_identical_instants_keep_tape_order() {
        // Same second, same (unset -> equal) millisecond: later row is older
        let mut newer = tick("10:00:03", 7.0, 0);
        let mut older = tick("10:00:03", 3.0, 0);
        newer.millisecond = None;
        older.millisecond = None;
        let bar = forming_bar(clock(10, 0.0), &[newer, older]).unwrap();
        assert_eq!(bar.open, 3.0);
        assert_eq!(bar.close, 7.0);
    }

    #[test]
    fn test_display_series_appends_colored_forming_bar() {
        let scheme = ColorScheme::traditional();
        let mut down = OneMinuteBar::opened_at(TEN - 60, 10.0);
        down.absorb(8.0);
        let same_minute = OneMinuteBar::opened_at(TEN, 5.0);
        let bars = vec![down, same_minute];

        let timeline = TickTimeline::new(&[tick("10:00:01", 5.0, 0)]);
        let series = display_series(&bars, &timeline, clock(30, 0.0), &scheme);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].time, TEN - 60);
        let forming = &series[1];
        assert_eq!(forming.time, TEN);
        assert_eq!(forming.colors.as_ref().unwrap().color, "#ef5350");
    }

    #[test]
    fn test_completed_before() {
        let bars: Vec<_> = (0..3)
            .map(|i| OneMinuteBar::opened_at(TEN + i * 60, 1.0))
            .collect();
        assert_eq!(completed_before(&bars, clock(60, 0.0)).len(), 1);
        assert_eq!(completed_before(&bars, clock(61, 0.0)).len(), 1);
        assert_eq!(completed_before(&bars, clock(600, 0.0)).len(), 3);
        assert_eq!(completed_before(&bars, clock(-1, 0.0)).len(), 0);
    }
}
