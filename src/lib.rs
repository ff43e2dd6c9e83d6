//! # Tapereplay
//!
//! Turns an exchange time-and-sales tape into one-minute OHLC bars and replays
//! it on a scrubbable virtual clock.
//!
//! ## Quick Start
//!
//! ```rust
//! use tapereplay::{Direction, Session, StepSize};
//!
//! let tape = "日付,時間,約定値,出来高\n\
//!             2025/12/05,09:01:10,101.5,100\n\
//!             2025/12/05,09:00:30,100.0,200\n\
//!             2025/12/05,09:00:00,99.5,300\n";
//!
//! let mut session = Session::default();
//! let summary = session.load(tape).unwrap();
//! assert_eq!(summary.bars, 2);
//!
//! // Scrub to the middle of the first minute
//! session.step(Direction::Forward, StepSize::Ten);
//! session.step(Direction::Forward, StepSize::Ten);
//! session.step(Direction::Forward, StepSize::Ten);
//! let frame = session.frame();
//! assert_eq!(frame.clock.as_deref(), Some("09:00:30.000"));
//!
//! // Nothing completed yet, one forming bar
//! assert_eq!(frame.bars.len(), 1);
//! assert_eq!(frame.bars[0].close, 100.0);
//! ```
//!
//! ## Pipeline
//!
//! 1. **Parse**: header check, positional rows, malformed rows skipped
//! 2. **Disambiguate**: prints sharing a second get synthetic milliseconds
//!    that keep their tape order
//! 3. **Aggregate**: ascending one-minute bars plus the tape's price precision
//! 4. **Color**: doji bars inherit the direction of the last non-doji bar
//!
//! ## Replay
//!
//! The clock is a single seek value in `[0, 100]` interpolated over bar
//! timestamps. The chart shows bars completed before the clock's minute plus
//! a bar rebuilt from raw prints up to the clock. Playback advances the clock
//! by timer period × speed and never rests inside the lunch break.

pub mod aggregator;
pub mod config;
pub mod disambiguate;
pub mod doji;
pub mod errors;
pub mod forming;
pub mod library;
pub mod logging;
pub mod pipeline;
pub mod playback;
pub mod player;
pub mod seek;
pub mod session;
pub mod styles;
pub mod tape_parser;
pub mod types;

// Re-export commonly used types for convenience
pub use aggregator::{Aggregation, aggregate, format_price};
pub use config::ReplayConfig;
pub use errors::{AggregationError, ConfigError, LoadError, ParseError};
pub use forming::{TickTimeline, completed_before, display_series, forming_bar};
pub use library::TapeLibrary;
pub use logging::{LogConfig, LogFormat, init_logging};
pub use pipeline::{LoadSummary, LoadedTape, PipelineOptions, load_tape};
pub use playback::{
    PlaybackState, PlaybackTick, PlaybackTimer, PlaybackTransition, SpeedMultiplier, StepSize,
    TickOutcome,
};
pub use player::{Command, CommandOutcome, Player};
pub use seek::{Direction, LunchBreak, seek_from_timestamp, timestamp_from_seek};
pub use session::{FailedLoadPolicy, Indicator, RenderFrame, Session, SessionOptions};
pub use styles::{ColorScheme, PriceFormat};
pub use tape_parser::{HeaderLabels, ParseStats, ParsedTape, parse};
pub use types::{OneMinuteBar, TapeRecord, TimeRange, VirtualTime};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Library initialization: installs logging configured from the environment.
///
/// Does nothing if the host application already set a global subscriber.
pub fn init() {
    if logging::init_logging(&LogConfig::from_env()).is_err() {
        tracing::debug!("global subscriber already set, keeping it");
    }
}
