//! Beat and tempo synchronization monitoring between the two decks.
//!
//! A periodic comparator reads both decks' effective tempo and beat phase
//! and publishes a [`SyncReading`] over a watch channel. Observers (a
//! phase meter, a sync indicator) read the latest value without ever
//! blocking the monitor loop. The monitor is the only component here with
//! an ongoing lifetime: exactly one task runs per deck pair, and starting
//! a replacement always cancels the previous task first.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use segue_core::Deck;

/// Beat phases closer than this (circular) count as aligned.
pub const PHASE_TOLERANCE: f64 = 0.05;
/// Effective tempos closer than this many bpm count as matched.
pub const BPM_TOLERANCE: f64 = 2.0;

/// One comparison of the two decks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Deck A beat phase in [0, 1).
    pub phase_a: f64,
    /// Deck B beat phase in [0, 1).
    pub phase_b: f64,
    /// Circular phase distance, always in [0, 0.5].
    pub phase_difference: f64,
    /// Absolute difference of the effective tempos.
    pub bpm_difference: f64,
    /// Whether the decks are beat-matched right now.
    pub synced: bool,
}

/// Result of reading the deck pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncReading {
    /// No usable data: neither deck is playing, or a deck has no
    /// positive effective bpm.
    #[default]
    Unavailable,
    Status(SyncStatus),
}

impl SyncReading {
    pub fn status(&self) -> Option<&SyncStatus> {
        match self {
            Self::Status(status) => Some(status),
            Self::Unavailable => None,
        }
    }
}

/// Compare two decks' tempo and beat phase.
///
/// `synced` is evaluated against the phase difference computed in this
/// same call, never a stale value from an earlier tick.
pub fn read_decks(deck_a: &Deck, deck_b: &Deck) -> SyncReading {
    if !deck_a.playing && !deck_b.playing {
        return SyncReading::Unavailable;
    }
    let (Some(bpm_a), Some(bpm_b)) = (deck_a.effective_bpm(), deck_b.effective_bpm()) else {
        return SyncReading::Unavailable;
    };

    // effective_bpm is Some here, so beat_phase is too.
    let phase_a = deck_a.beat_phase().unwrap_or(0.0);
    let phase_b = deck_b.beat_phase().unwrap_or(0.0);

    let raw_diff = (phase_a - phase_b).abs();
    let phase_difference = raw_diff.min(1.0 - raw_diff);
    let bpm_difference = (bpm_a - bpm_b).abs();
    let synced = phase_difference < PHASE_TOLERANCE && bpm_difference < BPM_TOLERANCE;

    SyncReading::Status(SyncStatus {
        phase_a,
        phase_b,
        phase_difference,
        bpm_difference,
        synced,
    })
}

/// Periodic sync comparator for one deck pair.
///
/// An explicit object rather than a free-running timer: `start` spawns the
/// polling task (cancelling any previous one), `poll_now` takes a reading
/// on demand, and `dispose`/drop tears the task down.
pub struct DeckSyncMonitor {
    deck_a: Arc<RwLock<Deck>>,
    deck_b: Arc<RwLock<Deck>>,
    interval: Duration,
    tx: watch::Sender<SyncReading>,
    task: Option<JoinHandle<()>>,
}

impl DeckSyncMonitor {
    /// Create a monitor over a deck pair with the default 50 ms interval.
    pub fn new(deck_a: Arc<RwLock<Deck>>, deck_b: Arc<RwLock<Deck>>) -> Self {
        let (tx, _) = watch::channel(SyncReading::Unavailable);
        Self {
            deck_a,
            deck_b,
            interval: Duration::from_millis(50),
            tx,
            task: None,
        }
    }

    /// Override the poll interval (before `start`).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Subscribe to readings. The receiver always yields the most recent
    /// value; slow observers never block the monitor.
    pub fn subscribe(&self) -> watch::Receiver<SyncReading> {
        self.tx.subscribe()
    }

    /// Take and publish a reading immediately.
    pub fn poll_now(&self) -> SyncReading {
        let reading = {
            let deck_a = self.deck_a.read();
            let deck_b = self.deck_b.read();
            read_decks(&deck_a, &deck_b)
        };
        self.tx.send_replace(reading);
        reading
    }

    /// Start the periodic task. Any previously running task for this pair
    /// is cancelled first; there is never more than one active timer.
    pub fn start(&mut self) {
        self.stop();

        let deck_a = Arc::clone(&self.deck_a);
        let deck_b = Arc::clone(&self.deck_b);
        let tx = self.tx.clone();
        let every = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                // Locks are released before publishing.
                let reading = {
                    let deck_a = deck_a.read();
                    let deck_b = deck_b.read();
                    read_decks(&deck_a, &deck_b)
                };
                tx.send_replace(reading);
            }
        }));
        log::debug!("deck sync monitor started ({:?} interval)", every);
    }

    /// Cancel the periodic task, if one is running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            log::debug!("deck sync monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Tear the monitor down explicitly.
    pub fn dispose(mut self) {
        self.stop();
    }
}

impl Drop for DeckSyncMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
