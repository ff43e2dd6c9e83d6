//! Playback state machine and timer
//!
//! Playback is `{Stopped, Playing}`. Every start gets a fresh generation
//! number; the timer stamps its ticks with it and the session drops ticks from
//! any other generation. A tick that was already queued when playback stopped
//! or a new tape was loaded therefore has no effect.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::errors::ConfigError;

/// Default wall-clock period between playback ticks
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing {
        generation: u64,
    },
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }
}

/// Result of a play/pause toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTransition {
    /// Playback began; the timer must be started with this generation
    Started { generation: u64 },
    /// Playback halted; any running timer must be cancelled
    Stopped,
    /// Nothing loaded
    Unavailable,
}

/// Outcome of feeding one timer tick to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick belonged to another generation or playback is stopped
    Ignored,
    Advanced,
    /// The clock passed the last bar; seek is pinned to 100 and playback stopped
    Finished,
}

/// Selectable playback speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedMultiplier {
    Tenth,
    #[default]
    X1,
    X2,
    X3,
    X5,
    X10,
    X30,
    X60,
}

impl SpeedMultiplier {
    pub const ALL: [SpeedMultiplier; 8] = [
        SpeedMultiplier::Tenth,
        SpeedMultiplier::X1,
        SpeedMultiplier::X2,
        SpeedMultiplier::X3,
        SpeedMultiplier::X5,
        SpeedMultiplier::X10,
        SpeedMultiplier::X30,
        SpeedMultiplier::X60,
    ];

    pub fn factor(self) -> f64 {
        match self {
            SpeedMultiplier::Tenth => 0.1,
            SpeedMultiplier::X1 => 1.0,
            SpeedMultiplier::X2 => 2.0,
            SpeedMultiplier::X3 => 3.0,
            SpeedMultiplier::X5 => 5.0,
            SpeedMultiplier::X10 => 10.0,
            SpeedMultiplier::X30 => 30.0,
            SpeedMultiplier::X60 => 60.0,
        }
    }
}

impl TryFrom<f64> for SpeedMultiplier {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|speed| (speed.factor() - value).abs() < 1e-9)
            .ok_or(ConfigError::InvalidSpeed { value })
    }
}

impl fmt::Display for SpeedMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.factor())
    }
}

/// Discrete step granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSize {
    /// 1 second × speed
    Single,
    /// 10 seconds × speed
    Ten,
}

impl StepSize {
    pub fn seconds(self) -> f64 {
        match self {
            StepSize::Single => 1.0,
            StepSize::Ten => 10.0,
        }
    }
}

/// One timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTick {
    pub generation: u64,
}

/// Periodic tick source owning its cancellation handle
#[derive(Debug)]
pub struct PlaybackTimer {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking for `generation`, cancelling any previous run first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, generation: u64, ticks: UnboundedSender<PlaybackTick>) {
        self.cancel();

        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if ticks.send(PlaybackTick { generation }).is_err() {
                    break;
                }
            }
        }));
        debug!(generation, period_ms = period.as_millis() as u64, "playback timer started");
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("playback timer cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PlaybackTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
