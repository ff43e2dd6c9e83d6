//! Replay session: the single owner of loaded data and clock state
//!
//! All derived values (current time, display bars, forming bar) are computed
//! from the stored seek value on demand. Mutations happen only through
//! `&mut self` methods, so there is exactly one writer.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::LoadError;
use crate::forming::display_series;
use crate::pipeline::{LoadSummary, LoadedTape, PipelineOptions, load_tape};
use crate::playback::{
    DEFAULT_TICK_PERIOD, PlaybackState, PlaybackTick, PlaybackTransition, SpeedMultiplier,
    StepSize, TickOutcome,
};
use crate::seek::{
    Direction, LunchBreak, SEEK_MAX, SEEK_MIN, clamp_seek, reset_seconds, reset_sub_seconds,
    seek_from_timestamp, timestamp_from_seek,
};
use crate::styles::{ColorScheme, PriceFormat};
use crate::tape_parser::HeaderLabels;
use crate::types::{MILLIS_PER_SECOND, OneMinuteBar, VirtualTime};

/// What a failed load does to the tape already on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedLoadPolicy {
    /// Previous tape and clock stay as they were
    #[default]
    KeepPrevious,
    /// Session returns to the empty state
    Clear,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// `None` disables the skip
    pub lunch_break: Option<LunchBreak>,
    pub colors: ColorScheme,
    pub labels: HeaderLabels,
    pub failed_load_policy: FailedLoadPolicy,
    pub tick_period: Duration,
    pub default_speed: SpeedMultiplier,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            lunch_break: Some(LunchBreak::default()),
            colors: ColorScheme::default(),
            labels: HeaderLabels::default(),
            failed_load_policy: FailedLoadPolicy::default(),
            tick_period: DEFAULT_TICK_PERIOD,
            default_speed: SpeedMultiplier::default(),
        }
    }
}

/// Status shown next to the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Indicator {
    Idle,
    Ready,
    Playing,
    Paused,
    SteppedBack,
    SteppedForward,
    Finished,
}

/// Everything the chart widget needs for one redraw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub bars: Vec<OneMinuteBar>,
    pub decimal_places: u32,
    pub price_format: PriceFormat,
    pub colors: ColorScheme,
    pub seek_value: f64,
    pub clock: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    options: SessionOptions,
    tape: Option<Arc<LoadedTape>>,
    seek: f64,
    speed: SpeedMultiplier,
    playback: PlaybackState,
    generation: u64,
    indicator: Indicator,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        let speed = options.default_speed;
        Self {
            options,
            tape: None,
            seek: SEEK_MIN,
            speed,
            playback: PlaybackState::Stopped,
            generation: 0,
            indicator: Indicator::Idle,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            labels: self.options.labels.clone(),
            colors: self.options.colors.clone(),
        }
    }

    /// Parse and aggregate `text`, replacing the current tape on success.
    ///
    /// Playback is stopped first in every case.
    pub fn load(&mut self, text: &str) -> Result<LoadSummary, LoadError> {
        self.stop();

        match load_tape(text, &self.pipeline_options()) {
            Ok(tape) => {
                let summary = tape.summary();
                self.install(Arc::new(tape), SEEK_MIN);
                Ok(summary)
            }
            Err(err) => {
                warn!(error = %err, policy = ?self.options.failed_load_policy, "tape load failed");
                if self.options.failed_load_policy == FailedLoadPolicy::Clear {
                    self.clear();
                }
                Err(err)
            }
        }
    }

    /// Swap in an already derived tape as one unit.
    pub fn install(&mut self, tape: Arc<LoadedTape>, seek: f64) {
        self.stop();
        self.tape = Some(tape);
        self.seek = clamp_seek(seek);
        self.indicator = Indicator::Ready;
    }

    pub fn clear(&mut self) {
        self.stop();
        self.tape = None;
        self.seek = SEEK_MIN;
        self.indicator = Indicator::Idle;
    }

    pub fn tape(&self) -> Option<&Arc<LoadedTape>> {
        self.tape.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.tape.as_ref().is_some_and(|tape| !tape.bars.is_empty())
    }

    /// Completed series for the whole tape, empty when nothing is loaded.
    pub fn bars(&self) -> &[OneMinuteBar] {
        self.tape
            .as_deref()
            .map(|tape| tape.bars.as_slice())
            .unwrap_or_default()
    }

    pub fn seek_value(&self) -> f64 {
        self.seek
    }

    pub fn set_seek(&mut self, seek: f64) {
        if !self.is_loaded() {
            return;
        }
        self.seek = clamp_seek(seek);
    }

    /// Position the clock at an instant (clamped to the series).
    pub fn seek_to_time(&mut self, time: VirtualTime) {
        if let Some(seek) = seek_from_timestamp(time, self.bars()) {
            self.seek = seek;
        }
    }

    pub fn current_time(&self) -> Option<VirtualTime> {
        timestamp_from_seek(self.seek, self.bars())
    }

    pub fn current_time_label(&self) -> Option<String> {
        self.current_time().map(VirtualTime::clock_label)
    }

    pub fn speed(&self) -> SpeedMultiplier {
        self.speed
    }

    pub fn set_speed(&mut self, speed: SpeedMultiplier) {
        self.speed = speed;
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn toggle_playback(&mut self) -> PlaybackTransition {
        if self.playback.is_playing() {
            self.stop()
        } else {
            self.play()
        }
    }

    /// Start playing. At the end of the tape playback restarts from 0.
    pub fn play(&mut self) -> PlaybackTransition {
        if !self.is_loaded() {
            return PlaybackTransition::Unavailable;
        }
        if let PlaybackState::Playing { generation } = self.playback {
            return PlaybackTransition::Started { generation };
        }

        if self.seek >= SEEK_MAX {
            self.seek = SEEK_MIN;
        }
        self.generation += 1;
        let generation = self.generation;
        self.playback = PlaybackState::Playing { generation };
        self.indicator = Indicator::Playing;
        info!(generation, speed = %self.speed, "playback started");
        PlaybackTransition::Started { generation }
    }

    pub fn stop(&mut self) -> PlaybackTransition {
        if self.playback.is_playing() {
            self.playback = PlaybackState::Stopped;
            self.indicator = Indicator::Paused;
            info!(seek = self.seek, "playback stopped");
        }
        PlaybackTransition::Stopped
    }

    /// Advance the clock by one timer period × speed.
    pub fn on_tick(&mut self, tick: PlaybackTick, period: Duration) -> TickOutcome {
        match self.playback {
            PlaybackState::Playing { generation } if generation == tick.generation => {}
            _ => return TickOutcome::Ignored,
        }
        let last_bar = self.bars().last().map(|bar| bar.time);
        let (Some(now), Some(last_bar)) = (self.current_time(), last_bar) else {
            self.playback = PlaybackState::Stopped;
            return TickOutcome::Ignored;
        };

        let advance = period.as_secs_f64() * MILLIS_PER_SECOND as f64 * self.speed.factor();
        let next = self.skip_lunch(now.plus_millis(advance), Direction::Forward);

        if next > VirtualTime::from_secs(last_bar) {
            self.seek = SEEK_MAX;
            self.playback = PlaybackState::Stopped;
            self.indicator = Indicator::Finished;
            info!("playback reached end of tape");
            return TickOutcome::Finished;
        }

        self.seek_to_time(next);
        TickOutcome::Advanced
    }

    /// Move the clock by ±1 s or ±10 s, scaled by the current speed.
    pub fn step(&mut self, direction: Direction, size: StepSize) -> Option<VirtualTime> {
        if !self.is_loaded() {
            return None;
        }
        let now = self.current_time()?;

        let delta = direction.sign() * size.seconds() * self.speed.factor() * MILLIS_PER_SECOND as f64;
        let next = self.skip_lunch(now.plus_millis(delta), direction);
        self.seek_to_time(next);

        self.indicator = match direction {
            Direction::Forward => Indicator::SteppedForward,
            Direction::Backward => Indicator::SteppedBack,
        };
        self.current_time()
    }

    /// Snap the clock to the start of its minute.
    pub fn reset_seconds(&mut self) -> Option<VirtualTime> {
        let now = self.current_time()?;
        self.seek_to_time(reset_seconds(now));
        self.current_time()
    }

    /// Snap the clock to the start of its second.
    pub fn reset_sub_seconds(&mut self) -> Option<VirtualTime> {
        let now = self.current_time()?;
        self.seek_to_time(reset_sub_seconds(now));
        self.current_time()
    }

    fn skip_lunch(&self, time: VirtualTime, direction: Direction) -> VirtualTime {
        match &self.options.lunch_break {
            Some(lunch) => lunch.skip(time, direction),
            None => time,
        }
    }

    /// Completed bars up to the clock plus the forming bar.
    ///
    /// At the end of the tape every bar counts as completed.
    pub fn display_bars(&self) -> Vec<OneMinuteBar> {
        let Some(tape) = self.tape.as_deref() else {
            return Vec::new();
        };
        if self.seek >= SEEK_MAX {
            return tape.bars.clone();
        }
        match self.current_time() {
            Some(now) => display_series(&tape.bars, &tape.timeline, now, &self.options.colors),
            None => Vec::new(),
        }
    }

    pub fn decimal_places(&self) -> u32 {
        self.tape.as_deref().map_or(0, |tape| tape.decimal_places)
    }

    pub fn frame(&self) -> RenderFrame {
        let decimal_places = self.decimal_places();
        RenderFrame {
            bars: self.display_bars(),
            decimal_places,
            price_format: PriceFormat::for_decimal_places(decimal_places),
            colors: self.options.colors.clone(),
            seek_value: self.seek,
            clock: self.current_time_label(),
        }
    }
}
