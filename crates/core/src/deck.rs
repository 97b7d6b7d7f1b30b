//! Deck state shared between the playback layer and the mix engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::track::Track;

/// Deck identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    /// Get the deck as a numeric index (0 for A, 1 for B).
    pub fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// Get the deck from a numeric index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::A),
            1 => Some(Self::B),
            _ => None,
        }
    }

    /// Get the other deck.
    pub fn other(&self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for DeckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// One playback slot.
///
/// The playback layer owns the clock: it updates `elapsed_seconds` and
/// `playing` as audio actually advances. The engine only reads those fields
/// and never seeks or controls playback through them.
#[derive(Debug, Clone)]
pub struct Deck {
    /// Deck identifier.
    pub id: DeckId,
    /// Currently loaded track, if any.
    pub loaded_track: Option<Arc<Track>>,
    /// Playback position in seconds.
    pub elapsed_seconds: f64,
    /// Tempo adjustment in percent, applied multiplicatively to the
    /// track bpm (+4.0 means 4% faster).
    pub tempo_percent: f64,
    /// Whether the deck is currently producing audio.
    pub playing: bool,
}

impl Deck {
    /// Create a new empty deck.
    pub fn new(id: DeckId) -> Self {
        Self {
            id,
            loaded_track: None,
            elapsed_seconds: 0.0,
            tempo_percent: 0.0,
            playing: false,
        }
    }

    /// Load a track, resetting position and transport state.
    pub fn load(&mut self, track: Arc<Track>) {
        self.loaded_track = Some(track);
        self.elapsed_seconds = 0.0;
        self.playing = false;
    }

    /// Load a track positioned at `start_seconds` (e.g. a planned entry
    /// point) without starting playback.
    pub fn load_at(&mut self, track: Arc<Track>, start_seconds: f64) {
        self.loaded_track = Some(track);
        self.elapsed_seconds = start_seconds.max(0.0);
        self.playing = false;
    }

    /// Reset deck to empty state.
    pub fn eject(&mut self) {
        self.loaded_track = None;
        self.elapsed_seconds = 0.0;
        self.tempo_percent = 0.0;
        self.playing = false;
    }

    /// Effective tempo after the tempo adjustment, when the loaded track
    /// has a usable bpm and the adjusted value is still positive.
    pub fn effective_bpm(&self) -> Option<f64> {
        let bpm = self.loaded_track.as_ref().and_then(|t| t.bpm)?;
        if bpm <= 0.0 {
            return None;
        }
        let adjusted = bpm * (1.0 + self.tempo_percent / 100.0);
        (adjusted > 0.0).then_some(adjusted)
    }

    /// Beat interval in seconds at the effective tempo.
    pub fn beat_interval(&self) -> Option<f64> {
        self.effective_bpm().map(|bpm| 60.0 / bpm)
    }

    /// Phase within the current beat, in [0, 1).
    ///
    /// A paused deck has phase 0. `None` when no usable bpm is known.
    pub fn beat_phase(&self) -> Option<f64> {
        let interval = self.beat_interval()?;
        if !self.playing {
            return Some(0.0);
        }
        Some((self.elapsed_seconds.rem_euclid(interval)) / interval)
    }

    /// Seconds of track remaining, when the duration is known.
    pub fn remaining_seconds(&self) -> Option<f64> {
        let duration = self.loaded_track.as_ref()?.duration_seconds?;
        Some((duration - self.elapsed_seconds).max(0.0))
    }
}
