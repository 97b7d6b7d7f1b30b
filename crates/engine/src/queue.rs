//! The play queue and its scheduler operations.
//!
//! An ordered sequence of track references with `current`/`next` pointers.
//! The queue is single-writer: one owner (the session or playback
//! controller) performs mutations; readers take snapshots. Invalid
//! indices and non-permutation reorders are rejected without touching the
//! queue, and a smart-fill whose oracle fails leaves it byte-for-byte
//! unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use segue_core::{Track, TrackId};

use crate::compat::compatibility_score;
use crate::oracle::{RankContext, RankingOracle};

/// Queue operation errors. All are caller contract violations or
/// recoverable conditions; none leave the queue partially mutated.
#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    #[error("queue index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("reorder is not a permutation of the queued tracks")]
    NotAPermutation,
    #[error("recommendation unavailable: {reason}")]
    RecommendationUnavailable { reason: String },
}

/// Ordered play queue with current/next pointers.
///
/// Invariant: when both pointers are present, `current < next`, and both
/// index into the entry list.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    entries: Vec<Arc<Track>>,
    current: Option<usize>,
    next: Option<usize>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Immutable snapshot of the queued tracks, in order.
    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Track>> {
        self.entries.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn next_index(&self) -> Option<usize> {
        self.next
    }

    pub fn current_track(&self) -> Option<&Arc<Track>> {
        self.current.and_then(|index| self.entries.get(index))
    }

    pub fn next_track(&self) -> Option<&Arc<Track>> {
        self.next.and_then(|index| self.entries.get(index))
    }

    /// Append a track to the end of the queue.
    ///
    /// The first appended track becomes current; the second becomes next.
    pub fn add(&mut self, track: Arc<Track>) {
        self.entries.push(track);
        let last = self.entries.len() - 1;
        match self.current {
            None => self.current = Some(last),
            Some(current) if self.next.is_none() && last > current => {
                self.next = Some(last);
            }
            _ => {}
        }
    }

    /// Remove the entry at `index` and re-derive both pointers.
    ///
    /// An index below a pointer shifts it down; removing the pointed-at
    /// entry promotes the following entry (clamped to the new end).
    pub fn remove_at(&mut self, index: usize) -> Result<Arc<Track>, QueueError> {
        if index >= self.entries.len() {
            return Err(QueueError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        let removed = self.entries.remove(index);

        self.current = Self::shift_after_removal(self.current, index, self.entries.len());
        self.next = Self::shift_after_removal(self.next, index, self.entries.len());
        self.restore_pointer_order();

        log::debug!(
            "removed {} at {} (current {:?}, next {:?})",
            removed.id,
            index,
            self.current,
            self.next
        );
        Ok(removed)
    }

    /// Canonical pointer adjustment after removing `removed` from a queue
    /// now `len` long.
    fn shift_after_removal(pointer: Option<usize>, removed: usize, len: usize) -> Option<usize> {
        let pointer = pointer?;
        if len == 0 {
            return None;
        }
        if removed < pointer {
            Some(pointer - 1)
        } else if removed == pointer {
            // The following entry takes the same index; if the removed
            // entry was last, clamp to the new end.
            Some(pointer.min(len - 1))
        } else {
            Some(pointer)
        }
    }

    /// Re-establish `current < next` after pointer adjustments.
    fn restore_pointer_order(&mut self) {
        if let (Some(current), Some(next)) = (self.current, self.next) {
            if next <= current {
                self.next = (current + 1 < self.entries.len()).then_some(current + 1);
            }
        }
        if self.current.is_none() {
            self.next = None;
        }
    }

    /// Replace the full ordering with a permutation of the same tracks.
    ///
    /// Both pointers follow their track identity into the new order, so a
    /// reorder never silently changes which track is current. A
    /// non-permutation is rejected before anything is touched.
    pub fn reorder(&mut self, new_order: &[TrackId]) -> Result<(), QueueError> {
        if new_order.len() != self.entries.len() {
            return Err(QueueError::NotAPermutation);
        }

        // Multiset equality check up front; the queue is only mutated
        // once the new order is known to be valid.
        let mut counts: HashMap<TrackId, usize> = HashMap::new();
        for track in &self.entries {
            *counts.entry(track.id).or_default() += 1;
        }
        for id in new_order {
            match counts.get_mut(id) {
                Some(count) if *count > 0 => *count -= 1,
                _ => return Err(QueueError::NotAPermutation),
            }
        }

        let current_id = self.current.map(|index| self.entries[index].id);
        let next_id = self.next.map(|index| self.entries[index].id);

        // Bucket entries by id so duplicate tracks reorder stably.
        let mut pool: HashMap<TrackId, Vec<Arc<Track>>> = HashMap::new();
        for track in self.entries.drain(..).rev() {
            pool.entry(track.id).or_default().push(track);
        }
        let mut reordered = Vec::with_capacity(new_order.len());
        for id in new_order {
            if let Some(track) = pool.get_mut(id).and_then(Vec::pop) {
                reordered.push(track);
            }
        }
        self.entries = reordered;

        self.current = current_id.and_then(|id| self.position_of(id));
        self.next = next_id.and_then(|id| self.position_of(id));
        self.restore_pointer_order();

        log::debug!(
            "reordered queue (current {:?}, next {:?})",
            self.current,
            self.next
        );
        Ok(())
    }

    fn position_of(&self, id: TrackId) -> Option<usize> {
        self.entries.iter().position(|track| track.id == id)
    }

    /// Promote `next` to `current` once a transition has landed.
    ///
    /// Returns the new current track, or `None` when the queue ran out.
    pub fn advance(&mut self) -> Option<&Arc<Track>> {
        match self.next {
            Some(next) => {
                self.current = Some(next);
                self.next = (next + 1 < self.entries.len()).then_some(next + 1);
            }
            None => {
                self.current = None;
            }
        }
        self.current_track()
    }

    /// Extend the queue with oracle-ranked recommendations.
    ///
    /// Candidates already in the queue are filtered out when
    /// `exclude_already_queued` is set, the rest are pre-ordered by
    /// compatibility with the queue's trailing track, and the oracle's
    /// ranking is appended, truncated to `target_count`. On oracle failure
    /// or a structurally invalid response the queue is left unchanged and
    /// the condition is reported.
    pub async fn smart_fill(
        &mut self,
        candidates: &[Arc<Track>],
        target_count: usize,
        exclude_already_queued: bool,
        oracle: &dyn RankingOracle,
    ) -> Result<usize, QueueError> {
        if target_count == 0 {
            return Ok(0);
        }

        let anchor = self.entries.last().cloned();
        let mut pool: Vec<Arc<Track>> = candidates
            .iter()
            .filter(|track| {
                !exclude_already_queued || !self.entries.iter().any(|t| t.id == track.id)
            })
            .cloned()
            .collect();
        if pool.is_empty() {
            log::info!("smart fill: no candidates left after filtering");
            return Ok(0);
        }

        if let Some(anchor) = &anchor {
            pool.sort_by(|a, b| {
                compatibility_score(anchor, b).cmp(&compatibility_score(anchor, a))
            });
        }

        let context = RankContext {
            anchor,
            requested: target_count,
        };
        let ranking = oracle.rank(&pool, context).await.map_err(|err| {
            log::warn!("smart fill: oracle failed: {}", err);
            QueueError::RecommendationUnavailable {
                reason: err.to_string(),
            }
        })?;

        // Map returned ids back onto the pool; ids the oracle invented and
        // duplicates are skipped rather than trusted.
        let mut picked: Vec<Arc<Track>> = Vec::new();
        for entry in &ranking.entries {
            if picked.len() == target_count {
                break;
            }
            if picked.iter().any(|t| t.id == entry.track) {
                continue;
            }
            if let Some(track) = pool.iter().find(|t| t.id == entry.track) {
                picked.push(Arc::clone(track));
            }
        }

        if picked.is_empty() {
            return Err(QueueError::RecommendationUnavailable {
                reason: "oracle returned no usable recommendations".to_string(),
            });
        }

        let appended = picked.len();
        for track in picked {
            log::debug!("smart fill: queued {}", track.display_name());
            self.add(track);
        }
        Ok(appended)
    }
}
