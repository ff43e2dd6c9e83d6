//! Several loaded tapes, one of them active in the session
//!
//! Each entry remembers its own scrubber position. Switching saves the
//! outgoing position and installs the incoming tape and position together,
//! so the session never pairs one tape's bars with another's seek.

use std::sync::Arc;

use tracing::info;

use crate::errors::LoadError;
use crate::pipeline::{LoadSummary, LoadedTape, PipelineOptions, load_tape};
use crate::seek::SEEK_MIN;
use crate::session::Session;

#[derive(Debug, Clone)]
struct LibraryEntry {
    name: String,
    tape: Arc<LoadedTape>,
    seek: f64,
}

#[derive(Debug, Default)]
pub struct TapeLibrary {
    entries: Vec<LibraryEntry>,
    active: Option<usize>,
}

impl TapeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.map(|index| self.entries[index].name.as_str())
    }

    /// Load `text` under `name`. An existing entry with that name is replaced
    /// and its position reset.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        text: &str,
        options: &PipelineOptions,
    ) -> Result<LoadSummary, LoadError> {
        let name = name.into();
        let tape = Arc::new(load_tape(text, options)?);
        let summary = tape.summary();

        match self.position(&name) {
            Some(index) => {
                self.entries[index].tape = tape;
                self.entries[index].seek = SEEK_MIN;
            }
            None => self.entries.push(LibraryEntry {
                name: name.clone(),
                tape,
                seek: SEEK_MIN,
            }),
        }
        info!(name = %name, bars = summary.bars, "tape added to library");
        Ok(summary)
    }

    /// Make `name` the session's tape. Returns false for unknown names.
    pub fn select(&mut self, name: &str, session: &mut Session) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };

        if let Some(current) = self.active {
            self.entries[current].seek = session.seek_value();
        }
        let entry = &self.entries[index];
        session.install(Arc::clone(&entry.tape), entry.seek);
        self.active = Some(index);
        true
    }

    /// Forget which entry is active, after the session was given a tape
    /// from outside the library.
    pub fn deactivate(&mut self) {
        self.active = None;
    }

    /// Drop an entry. Removing the active tape clears the session.
    pub fn remove(&mut self, name: &str, session: &mut Session) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        self.entries.remove(index);

        self.active = match self.active {
            Some(active) if active == index => {
                session.clear();
                None
            }
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        true
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}
