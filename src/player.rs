//! Event loop gluing the session to its timer
//!
//! `Player` is the only place that owns both the [`Session`] and the
//! [`PlaybackTimer`]. Every command goes through [`Player::handle`], which
//! keeps the timer in step with the session's playback state: started with
//! the session's generation on play, cancelled on anything that stops
//! playback (pause, load, file switch, end of tape).

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::errors::LoadError;
use crate::library::TapeLibrary;
use crate::pipeline::LoadSummary;
use crate::playback::{
    PlaybackState, PlaybackTick, PlaybackTimer, PlaybackTransition, SpeedMultiplier, StepSize,
    TickOutcome,
};
use crate::seek::Direction;
use crate::session::{Session, SessionOptions};
use crate::types::VirtualTime;

/// User-level operations
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the session tape with pasted text
    Load { text: String },
    /// Load a file into the library and make it active
    AddFile { name: String, text: String },
    SelectFile { name: String },
    RemoveFile { name: String },
    TogglePlayback,
    Play,
    Pause,
    Step { direction: Direction, size: StepSize },
    SetSpeed(SpeedMultiplier),
    Seek(f64),
    SeekTo(VirtualTime),
    ResetSeconds,
    ResetSubSeconds,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Loaded(LoadSummary),
    Playback(PlaybackTransition),
    /// Clock after a step or reset, `None` with nothing loaded
    Moved(Option<VirtualTime>),
    /// False when the named file is unknown
    Selected(bool),
    Removed(bool),
    Done,
}

#[derive(Debug)]
pub struct Player {
    session: Session,
    library: TapeLibrary,
    timer: PlaybackTimer,
    /// Generation the running timer stamps its ticks with
    timer_generation: Option<u64>,
    tick_tx: UnboundedSender<PlaybackTick>,
    tick_rx: UnboundedReceiver<PlaybackTick>,
}

impl Player {
    pub fn new(options: SessionOptions) -> Self {
        let timer = PlaybackTimer::new(options.tick_period);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(options),
            library: TapeLibrary::new(),
            timer,
            timer_generation: None,
            tick_tx,
            tick_rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn library(&self) -> &TapeLibrary {
        &self.library
    }

    pub fn tick_period(&self) -> Duration {
        self.timer.period()
    }

    pub fn is_playing(&self) -> bool {
        self.session.playback_state().is_playing()
    }

    /// Apply one command. Starting playback spawns the timer, so this must
    /// run inside a tokio runtime.
    pub fn handle(&mut self, command: Command) -> Result<CommandOutcome, LoadError> {
        debug!(?command, "handling command");

        let outcome = match command {
            Command::Load { text } => {
                self.halt();
                let loaded = self.session.load(&text);
                // A failed load may leave the library's tape in place
                if loaded.is_ok() || !self.session.is_loaded() {
                    self.library.deactivate();
                }
                CommandOutcome::Loaded(loaded?)
            }
            Command::AddFile { name, text } => {
                self.halt();
                let summary = self
                    .library
                    .add(name.as_str(), &text, &self.session.pipeline_options())?;
                self.library.select(&name, &mut self.session);
                CommandOutcome::Loaded(summary)
            }
            Command::SelectFile { name } => {
                self.halt();
                CommandOutcome::Selected(self.library.select(&name, &mut self.session))
            }
            Command::RemoveFile { name } => {
                CommandOutcome::Removed(self.library.remove(&name, &mut self.session))
            }
            Command::TogglePlayback => CommandOutcome::Playback(self.session.toggle_playback()),
            Command::Play => CommandOutcome::Playback(self.session.play()),
            Command::Pause => CommandOutcome::Playback(self.session.stop()),
            Command::Step { direction, size } => {
                CommandOutcome::Moved(self.session.step(direction, size))
            }
            Command::SetSpeed(speed) => {
                self.session.set_speed(speed);
                CommandOutcome::Done
            }
            Command::Seek(seek) => {
                self.session.set_seek(seek);
                CommandOutcome::Done
            }
            Command::SeekTo(time) => {
                self.session.seek_to_time(time);
                CommandOutcome::Done
            }
            Command::ResetSeconds => CommandOutcome::Moved(self.session.reset_seconds()),
            Command::ResetSubSeconds => CommandOutcome::Moved(self.session.reset_sub_seconds()),
        };

        self.sync_timer();
        Ok(outcome)
    }

    fn sync_timer(&mut self) {
        match self.session.playback_state() {
            PlaybackState::Playing { generation } => {
                if self.timer_generation != Some(generation) {
                    self.timer.start(generation, self.tick_tx.clone());
                    self.timer_generation = Some(generation);
                }
            }
            PlaybackState::Stopped => {
                self.timer.cancel();
                self.timer_generation = None;
            }
        }
    }

    fn stop_timer(&mut self) {
        self.timer.cancel();
        self.timer_generation = None;
    }

    /// Stop playback and its timer ahead of anything that replaces the
    /// session's data.
    fn halt(&mut self) {
        self.session.stop();
        self.stop_timer();
    }

    /// Wait for the next timer tick and apply it.
    ///
    /// Returns `None` when playback is stopped, since no tick will come.
    pub async fn next_tick(&mut self) -> Option<TickOutcome> {
        if !self.is_playing() {
            return None;
        }
        let tick = self.tick_rx.recv().await?;
        let outcome = self.session.on_tick(tick, self.timer.period());
        if !self.is_playing() {
            self.stop_timer();
        }
        Some(outcome)
    }

    /// Drive playback until it stops, calling `on_advance` after every
    /// clock movement.
    pub async fn run_until_stopped<F>(&mut self, mut on_advance: F)
    where
        F: FnMut(&Session),
    {
        while let Some(outcome) = self.next_tick().await {
            if outcome != TickOutcome::Ignored {
                on_advance(&self.session);
            }
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}
