//! Single entry point from tape text to a replayable series
//!
//! parse → disambiguate milliseconds → aggregate → color dojis

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::aggregate;
use crate::disambiguate::assign_milliseconds;
use crate::doji::resolve_doji_colors;
use crate::errors::LoadError;
use crate::forming::TickTimeline;
use crate::styles::ColorScheme;
use crate::tape_parser::{HeaderLabels, ParseStats, parse_with_labels};
use crate::types::{OneMinuteBar, TapeRecord, TimeRange};

/// Options shared by every load
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub labels: HeaderLabels,
    pub colors: ColorScheme,
}

/// Everything derived from one tape. Immutable once built.
#[derive(Debug, Clone)]
pub struct LoadedTape {
    /// Records in input (newest first) order, milliseconds assigned
    pub ticks: Vec<TapeRecord>,
    pub timeline: TickTimeline,
    pub bars: Vec<OneMinuteBar>,
    pub decimal_places: u32,
    pub time_range: TimeRange,
    pub stats: ParseStats,
}

/// Load summary for logs and UI notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub ticks: usize,
    pub bars: usize,
    pub decimal_places: u32,
    pub time_range: TimeRange,
    pub rows_skipped: usize,
}

impl LoadedTape {
    pub fn summary(&self) -> LoadSummary {
        LoadSummary {
            ticks: self.ticks.len(),
            bars: self.bars.len(),
            decimal_places: self.decimal_places,
            time_range: self.time_range,
            rows_skipped: self.stats.rows_skipped,
        }
    }
}

/// Run the whole pipeline over tape text.
pub fn load_tape(text: &str, options: &PipelineOptions) -> Result<LoadedTape, LoadError> {
    debug!(bytes = text.len(), "loading tape");

    let parsed = parse_with_labels(text, &options.labels)?;
    let mut ticks = parsed.records;
    assign_milliseconds(&mut ticks);

    let aggregation = aggregate(&ticks)?;
    let mut bars = aggregation.bars;
    resolve_doji_colors(&mut bars, &options.colors);

    let timeline = TickTimeline::new(&ticks);

    let tape = LoadedTape {
        ticks,
        timeline,
        bars,
        decimal_places: aggregation.decimal_places,
        time_range: aggregation.time_range,
        stats: parsed.stats,
    };

    let summary = tape.summary();
    info!(
        ticks = summary.ticks,
        bars = summary.bars,
        decimal_places = summary.decimal_places,
        rows_skipped = summary.rows_skipped,
        "tape loaded"
    );

    Ok(tape)
}
