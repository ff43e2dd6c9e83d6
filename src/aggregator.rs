//! One-minute OHLC aggregation
//!
//! ## Algorithm
//!
//! 1. Walk the tape oldest first (input is newest first, so it is reversed)
//! 2. Drop prints whose date or time is not a real calendar instant
//! 3. Bucket by minute: the first print opens the bar, every print updates
//!    high/low, the last print closes it
//! 4. Emit buckets in ascending time order
//!
//! Bucket keys use the tape's literal clock fields as UTC, so a print at
//! `09:00:30` lands in the bar stamped `09:00:00Z` of the same date.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::errors::AggregationError;
use crate::types::{OneMinuteBar, TapeRecord, TimeRange};

/// Aggregated bar series plus derived metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// Strictly ascending, one bar per minute that had a print
    pub bars: Vec<OneMinuteBar>,
    /// Largest price precision seen on the tape
    pub decimal_places: u32,
    pub time_range: TimeRange,
}

/// Aggregate newest-first tape records into one-minute bars.
pub fn aggregate(records: &[TapeRecord]) -> Result<Aggregation, AggregationError> {
    if records.is_empty() {
        return Err(AggregationError::EmptyInput);
    }

    let mut buckets: BTreeMap<i64, OneMinuteBar> = BTreeMap::new();
    let mut decimal_places = 0u32;
    let mut dropped = 0usize;

    for record in records.iter().rev() {
        let Some(bucket) = record.minute_bucket() else {
            dropped += 1;
            continue;
        };

        decimal_places = decimal_places.max(record.price_decimal_places);

        buckets
            .entry(bucket)
            .and_modify(|bar| bar.absorb(record.price))
            .or_insert_with(|| OneMinuteBar::opened_at(bucket, record.price));
    }

    let bars: Vec<OneMinuteBar> = buckets.into_values().collect();
    let time_range = TimeRange::of(&bars).ok_or(AggregationError::NoValidBars)?;

    debug!(
        bars = bars.len(),
        dropped,
        decimal_places,
        min = time_range.min,
        max = time_range.max,
        "aggregated tape"
    );

    Ok(Aggregation {
        bars,
        decimal_places,
        time_range,
    })
}

/// Render a price with the tape's precision.
pub fn format_price(price: f64, decimal_places: u32) -> String {
    format!("{:.*}", decimal_places as usize, price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(time: &str, price: f64, places: u32) -> TapeRecord {
        TapeRecord {
            date: "2025/12/05".to_string(),
            time: time.to_string(),
            price,
            volume: 100.0,
            price_decimal_places: places,
            millisecond: None,
        }
    }

    // 2025-12-05T09:00:00Z
    const NINE: i64 = 1_764_925_200;

    #[test]
    fn test_three_ticks_one_bar() {
        // Newest first: 102 is the last print, 100 the first
        let records = vec![
            tick("09:00:40", 102.0, 0),
            tick("09:00:20", 105.0, 0),
            tick("09:00:05", 100.0, 0),
        ];
        let agg = aggregate(&records).unwrap();
        assert_eq!(agg.bars.len(), 1);

        let bar = &agg.bars[0];
        assert_eq!(bar.time, NINE);
        assert_eq!(
            (bar.open, bar.high, bar.low, bar.close),
            (100.0, 105.0, 100.0, 102.0)
        );
        assert_eq!(agg.time_range, TimeRange { min: NINE, max: NINE });
    }

    #[test]
    fn test_bars_are_sorted_and_minute_aligned() {
        let records = vec![
            tick("09:02:00", 3.0, 0),
            tick("09:01:59", 2.5, 1),
            tick("09:00:00", 1.0, 0),
        ];
        let agg = aggregate(&records).unwrap();
        let times: Vec<i64> = agg.bars.iter().map(|b| b.time).collect();
        assert_eq!(times, vec![NINE, NINE + 60, NINE + 120]);
        assert!(times.iter().all(|t| t % 60 == 0));
        assert_eq!(agg.decimal_places, 1);
    }

    #[test]
    fn test_same_second_close_uses_input_order() {
        // Two prints in the same second: the later row in the input is older
        let records = vec![tick("09:00:10", 7.0, 0), tick("09:00:10", 5.0, 0)];
        let bar = &aggregate(&records).unwrap().bars[0];
        assert_eq!(bar.open, 5.0);
        assert_eq!(bar.close, 7.0);
    }

    #[test]
    fn test_invalid_rows_are_dropped() {
        let mut bad = tick("09:00:10", 999.0, 4);
        bad.date = "2025/13/01".to_string();
        let records = vec![bad, tick("09:00:00", 1.0, 0)];
        let agg = aggregate(&records).unwrap();
        assert_eq!(agg.bars.len(), 1);
        assert_eq!(agg.bars[0].high, 1.0);
        // Precision of dropped rows is ignored
        assert_eq!(agg.decimal_places, 0);
    }

    #[test]
    fn test_failures() {
        assert_eq!(aggregate(&[]), Err(AggregationError::EmptyInput));

        let mut bad = tick("09:00:00", 1.0, 0);
        bad.time = "nope".to_string();
        assert_eq!(aggregate(&[bad]), Err(AggregationError::NoValidBars));
    }

    #[test]
    fn test_format_price_restores_precision() {
        assert_eq!(format_price(257.5, 1), "257.5");
        assert_eq!(format_price(0.001, 4), "0.0010");
        assert_eq!(format_price(258.0, 0), "258");
    }
}
