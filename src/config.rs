//! Replay configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file
//! (any format `config` understands), then `TAPEREPLAY__SECTION__KEY`
//! environment variables.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::playback::SpeedMultiplier;
use crate::seek::LunchBreak;
use crate::session::{FailedLoadPolicy, SessionOptions};
use crate::styles::ColorScheme;
use crate::tape_parser::HeaderLabels;

pub const ENV_PREFIX: &str = "TAPEREPLAY";

const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReplayConfig {
    pub playback: PlaybackSettings,
    pub session: SessionSettings,
    pub parser: HeaderLabels,
    pub style: ColorScheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Wall-clock milliseconds between playback ticks
    pub tick_period_ms: u64,
    /// Must be one of the selectable multipliers
    pub default_speed: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            default_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub lunch_start: String,
    /// Exclusive
    pub lunch_end: String,
    pub lunch_skip: bool,
    pub failed_load_policy: FailedLoadPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            lunch_start: "11:30:00".to_string(),
            lunch_end: "12:30:00".to_string(),
            lunch_skip: true,
            failed_load_policy: FailedLoadPolicy::KeepPrevious,
        }
    }
}

impl ReplayConfig {
    /// Load from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(env_source(None))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parse TOML text, without consulting the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Lunch window to skip, `None` when skipping is disabled.
    pub fn lunch_break(&self) -> Result<Option<LunchBreak>, ConfigError> {
        if !self.session.lunch_skip {
            return Ok(None);
        }
        let start = parse_time_of_day("session.lunch_start", &self.session.lunch_start)?;
        let end = parse_time_of_day("session.lunch_end", &self.session.lunch_end)?;
        LunchBreak::new(start, end)
            .map(Some)
            .ok_or_else(|| ConfigError::EmptyLunchBreak {
                start: self.session.lunch_start.clone(),
                end: self.session.lunch_end.clone(),
            })
    }

    pub fn speed(&self) -> Result<SpeedMultiplier, ConfigError> {
        SpeedMultiplier::try_from(self.playback.default_speed)
    }

    pub fn tick_period(&self) -> Result<Duration, ConfigError> {
        match self.playback.tick_period_ms {
            0 => Err(ConfigError::InvalidTickPeriod),
            ms => Ok(Duration::from_millis(ms)),
        }
    }

    /// Validate and convert into session options.
    pub fn session_options(&self) -> Result<SessionOptions, ConfigError> {
        Ok(SessionOptions {
            lunch_break: self.lunch_break()?,
            colors: self.style.clone(),
            labels: self.parser.clone(),
            failed_load_policy: self.session.failed_load_policy,
            tick_period: self.tick_period()?,
            default_speed: self.speed()?,
        })
    }
}

fn env_source(vars: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .source(vars)
}

fn parse_time_of_day(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), TIME_OF_DAY_FORMAT).map_err(|_| {
        ConfigError::InvalidTimeOfDay {
            field,
            value: value.to_string(),
        }
    })
}
