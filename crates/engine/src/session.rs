//! The auto-mix session: glue between the queue, the planner, and the
//! two decks.
//!
//! `MixSession` owns the queue and the deck pair exclusively (single
//! writer). Driven by `tick`, it watches the live deck's clock, starts
//! the planned transition when playback crosses the exit point, publishes
//! per-tick fade weights for the playback layer to apply, and completes
//! the handover. It can be driven by a real clock or a simulated one; it
//! never touches audio itself.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use segue_core::{Deck, DeckId, Track};

use crate::crossfade::{CrossfadeState, FadeWeights};
use crate::planner::{plan, TransitionPlan, TransitionRequest, TransitionStyle};
use crate::queue::PlayQueue;

/// Commands accepted by the session.
#[derive(Debug, Clone)]
pub enum MixerCommand {
    /// Start playback on a deck.
    Play { deck: DeckId },
    /// Pause playback on a deck.
    Pause { deck: DeckId },
    /// Set a deck's tempo adjustment percentage.
    SetTempo { deck: DeckId, percent: f64 },
    /// Enable or disable automatic transitions.
    SetAutoMix { enabled: bool },
    /// Re-plan the pending transition with an explicit type choice.
    RequestTransition { request: TransitionRequest },
}

/// Events emitted by the session.
#[derive(Debug, Clone)]
pub enum MixerEvent {
    /// A transition has been planned for the current track pair.
    TransitionPlanned { plan: TransitionPlan },
    /// The live deck crossed the exit point; the target deck starts at
    /// the plan's entry point.
    TransitionStarted { plan: TransitionPlan },
    /// Per-tick fade weights while a transition runs.
    FadeProgress {
        from: DeckId,
        to: DeckId,
        progress: f64,
        weights: FadeWeights,
    },
    /// The handover landed; `now_live` carries the new current track.
    TransitionCompleted { now_live: DeckId },
    /// The live track ended with nothing queued after it.
    QueueExhausted,
    /// Transport state changed on a deck.
    DeckStateChanged {
        deck: DeckId,
        playing: bool,
        elapsed_seconds: f64,
    },
}

struct ActiveTransition {
    plan: TransitionPlan,
    fade: CrossfadeState,
}

/// Drives automatic transitions across a two-deck setup.
pub struct MixSession {
    deck_a: Arc<RwLock<Deck>>,
    deck_b: Arc<RwLock<Deck>>,
    live: DeckId,
    queue: PlayQueue,
    style: TransitionStyle,
    auto_mix: bool,
    pending: Option<TransitionPlan>,
    active: Option<ActiveTransition>,
    events: mpsc::Sender<MixerEvent>,
}

impl MixSession {
    /// Create a session over a queue. Returns the session and the event
    /// stream observers read from.
    pub fn new(queue: PlayQueue, style: TransitionStyle) -> (Self, mpsc::Receiver<MixerEvent>) {
        let (events, rx) = mpsc::channel(64);
        let session = Self {
            deck_a: Arc::new(RwLock::new(Deck::new(DeckId::A))),
            deck_b: Arc::new(RwLock::new(Deck::new(DeckId::B))),
            live: DeckId::A,
            queue,
            style,
            auto_mix: true,
            pending: None,
            active: None,
            events,
        };
        (session, rx)
    }

    /// Shared handle to a deck, e.g. for a [`DeckSyncMonitor`].
    ///
    /// [`DeckSyncMonitor`]: crate::sync::DeckSyncMonitor
    pub fn deck(&self, id: DeckId) -> &Arc<RwLock<Deck>> {
        match id {
            DeckId::A => &self.deck_a,
            DeckId::B => &self.deck_b,
        }
    }

    /// The deck currently carrying the set.
    pub fn live_deck(&self) -> DeckId {
        self.live
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut PlayQueue {
        &mut self.queue
    }

    /// Whether a transition is currently running.
    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    /// The plan waiting for its exit point, if any.
    pub fn pending_plan(&self) -> Option<&TransitionPlan> {
        self.pending.as_ref()
    }

    /// Load the queue's current track onto the live deck and plan the
    /// first transition.
    pub fn start(&mut self) {
        let Some(current) = self.queue.current_track().cloned() else {
            log::warn!("session started with an empty queue");
            return;
        };
        {
            let mut deck = self.deck(self.live).write();
            deck.load(current);
            deck.playing = true;
        }
        self.emit_deck_state(self.live);
        log::info!("session started on deck {}", self.live);
        self.plan_pending(TransitionRequest::Auto);
    }

    /// Handle a controller command.
    pub fn handle_command(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::Play { deck } => {
                self.deck(deck).write().playing = true;
                self.emit_deck_state(deck);
                log::info!("deck {} playing", deck);
            }
            MixerCommand::Pause { deck } => {
                self.deck(deck).write().playing = false;
                self.emit_deck_state(deck);
                log::info!("deck {} paused", deck);
            }
            MixerCommand::SetTempo { deck, percent } => {
                self.deck(deck).write().tempo_percent = percent;
                log::debug!("deck {} tempo set to {:+.1}%", deck, percent);
            }
            MixerCommand::SetAutoMix { enabled } => {
                self.auto_mix = enabled;
                log::info!(
                    "auto mix {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            MixerCommand::RequestTransition { request } => {
                self.plan_pending(request);
            }
        }
    }

    /// Advance the session clock by `dt` seconds.
    ///
    /// Moves every playing deck forward, starts the pending transition
    /// when the live deck crosses its exit point, and progresses any
    /// running crossfade.
    pub fn tick(&mut self, dt: f64) {
        for id in [DeckId::A, DeckId::B] {
            let mut deck = self.deck(id).write();
            if deck.playing {
                deck.elapsed_seconds += dt;
            }
        }

        if let Some(active) = self.active.as_mut() {
            let weights = active.fade.advance(dt);
            let progress = active.fade.progress().unwrap_or(1.0);
            let complete = active.fade.is_complete();
            let from = self.live;
            let _ = self.events.try_send(MixerEvent::FadeProgress {
                from,
                to: from.other(),
                progress,
                weights,
            });
            if complete {
                self.finish_transition();
            }
            return;
        }

        if !self.auto_mix {
            return;
        }

        let elapsed = self.deck(self.live).read().elapsed_seconds;
        match self.pending.as_ref().map(|plan| plan.exit_point) {
            Some(exit_point) if elapsed >= exit_point => self.begin_transition(),
            Some(_) => {}
            None => {
                // Nothing planned: the set ends when the live track does.
                let ended = {
                    let deck = self.deck(self.live).read();
                    deck.playing
                        && deck
                            .remaining_seconds()
                            .is_some_and(|remaining| remaining <= 0.0)
                };
                if ended {
                    self.deck(self.live).write().playing = false;
                    self.emit_deck_state(self.live);
                    let _ = self.events.try_send(MixerEvent::QueueExhausted);
                    log::info!("queue exhausted; deck {} stopped", self.live);
                }
            }
        }
    }

    /// Stop both decks and discard transition state.
    pub fn dispose(&mut self) {
        self.active = None;
        self.pending = None;
        for id in [DeckId::A, DeckId::B] {
            let mut deck = self.deck(id).write();
            if deck.playing {
                deck.playing = false;
            }
        }
        log::info!("session disposed");
    }

    fn plan_pending(&mut self, request: TransitionRequest) {
        if self.active.is_some() {
            log::debug!("ignoring plan request mid-transition");
            return;
        }
        let (Some(current), Some(next)) = (
            self.queue.current_track().cloned(),
            self.queue.next_track().cloned(),
        ) else {
            self.pending = None;
            return;
        };
        let plan = plan(&current, &next, request, &self.style);
        let _ = self.events.try_send(MixerEvent::TransitionPlanned { plan: plan.clone() });
        self.pending = Some(plan);
    }

    fn begin_transition(&mut self) {
        let Some(plan) = self.pending.take() else {
            return;
        };
        let Some(target) = self.target_track(&plan) else {
            log::warn!("pending plan has no matching queue track; dropping it");
            return;
        };

        let incoming = self.live.other();
        {
            let mut deck = self.deck(incoming).write();
            deck.load_at(target, plan.entry_point);
            deck.playing = true;
        }
        self.emit_deck_state(incoming);

        log::info!(
            "transition {} -> {} started on deck {} ({})",
            plan.source,
            plan.target,
            incoming,
            plan.transition_type
        );
        self.active = Some(ActiveTransition {
            fade: CrossfadeState::start(plan.curve, plan.duration_seconds),
            plan: plan.clone(),
        });
        let _ = self.events.try_send(MixerEvent::TransitionStarted { plan });
    }

    fn target_track(&self, plan: &TransitionPlan) -> Option<Arc<Track>> {
        let next = self.queue.next_track()?;
        (next.id == plan.target).then(|| Arc::clone(next))
    }

    fn finish_transition(&mut self) {
        let Some(finished) = self.active.take() else {
            return;
        };

        let outgoing = self.live;
        {
            let mut deck = self.deck(outgoing).write();
            deck.playing = false;
        }
        self.emit_deck_state(outgoing);

        self.live = outgoing.other();
        self.queue.advance();
        let _ = self.events.try_send(MixerEvent::TransitionCompleted {
            now_live: self.live,
        });
        log::info!(
            "transition {} -> {} complete; deck {} is live",
            finished.plan.source,
            finished.plan.target,
            self.live
        );

        self.plan_pending(TransitionRequest::Auto);
    }

    fn emit_deck_state(&self, id: DeckId) {
        let (playing, elapsed_seconds) = {
            let deck = self.deck(id).read();
            (deck.playing, deck.elapsed_seconds)
        };
        let _ = self.events.try_send(MixerEvent::DeckStateChanged {
            deck: id,
            playing,
            elapsed_seconds,
        });
    }
}

#[cfg(test)]
mod tests {
    use segue_core::{SectionKind, SectionSpan, TrackId};

    use crate::planner::TransitionType;

    use super::*;

    fn structured_track(id: i64, bpm: f64, duration: f64) -> Arc<Track> {
        let mut track = Track::new(TrackId(id), format!("Track {}", id));
        track.bpm = Some(bpm);
        track.duration_seconds = Some(duration);
        track
            .structure
            .push(SectionKind::Intro, SectionSpan::new(0.0, 16.0));
        track
            .structure
            .push(SectionKind::Outro, SectionSpan::at(duration - 40.0));
        Arc::new(track)
    }

    fn session_with_tracks(tracks: Vec<Arc<Track>>) -> (MixSession, mpsc::Receiver<MixerEvent>) {
        let mut queue = PlayQueue::new();
        for track in tracks {
            queue.add(track);
        }
        MixSession::new(queue, TransitionStyle::default())
    }

    fn drain(rx: &mut mpsc::Receiver<MixerEvent>) -> Vec<MixerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn start_loads_current_track_and_plans() {
        let (mut session, mut rx) = session_with_tracks(vec![
            structured_track(1, 120.0, 240.0),
            structured_track(2, 122.0, 240.0),
        ]);
        session.start();

        assert!(session.deck(DeckId::A).read().playing);
        let plan = session.pending_plan().expect("plan");
        assert_eq!(plan.source, TrackId(1));
        assert_eq!(plan.target, TrackId(2));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, MixerEvent::TransitionPlanned { .. })));
    }

    #[test]
    fn tick_runs_a_full_handover() {
        let (mut session, mut rx) = session_with_tracks(vec![
            structured_track(1, 120.0, 240.0),
            structured_track(2, 122.0, 240.0),
        ]);
        session.start();
        let exit = session.pending_plan().unwrap().exit_point;
        let duration = session.pending_plan().unwrap().duration_seconds;

        // Jump to just before the exit point; no transition yet.
        session.tick(exit - 1.0);
        assert!(!session.is_transitioning());

        // Crossing the exit point brings deck B in at the entry point.
        session.tick(1.0);
        assert!(session.is_transitioning());
        assert!(session.deck(DeckId::B).read().playing);

        // Push through the whole fade.
        let mut remaining = duration + 1.0;
        while remaining > 0.0 {
            session.tick(0.5);
            remaining -= 0.5;
        }
        assert!(!session.is_transitioning());
        assert_eq!(session.live_deck(), DeckId::B);
        assert!(!session.deck(DeckId::A).read().playing);
        assert_eq!(session.queue().current_track().unwrap().id, TrackId(2));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, MixerEvent::TransitionStarted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, MixerEvent::TransitionCompleted { now_live: DeckId::B })));
        // Fade weights were published while the transition ran.
        assert!(events
            .iter()
            .any(|e| matches!(e, MixerEvent::FadeProgress { .. })));
    }

    #[test]
    fn auto_mix_off_holds_the_transition() {
        let (mut session, _rx) = session_with_tracks(vec![
            structured_track(1, 120.0, 240.0),
            structured_track(2, 122.0, 240.0),
        ]);
        session.start();
        session.handle_command(MixerCommand::SetAutoMix { enabled: false });

        session.tick(500.0);
        assert!(!session.is_transitioning());
        assert_eq!(session.live_deck(), DeckId::A);
    }

    #[test]
    fn single_track_queue_exhausts() {
        let (mut session, mut rx) =
            session_with_tracks(vec![structured_track(1, 120.0, 100.0)]);
        session.start();
        assert!(session.pending_plan().is_none());

        session.tick(100.5);
        assert!(!session.deck(DeckId::A).read().playing);
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, MixerEvent::QueueExhausted)));
    }

    #[test]
    fn explicit_transition_request_replans() {
        let (mut session, _rx) = session_with_tracks(vec![
            structured_track(1, 120.0, 240.0),
            structured_track(2, 122.0, 240.0),
        ]);
        session.start();

        session.handle_command(MixerCommand::RequestTransition {
            request: TransitionRequest::Fixed(TransitionType::EchoOut),
        });
        assert_eq!(
            session.pending_plan().unwrap().transition_type,
            TransitionType::EchoOut
        );
    }

    #[test]
    fn dispose_stops_everything() {
        let (mut session, _rx) = session_with_tracks(vec![
            structured_track(1, 120.0, 240.0),
            structured_track(2, 122.0, 240.0),
        ]);
        session.start();
        session.dispose();
        assert!(!session.deck(DeckId::A).read().playing);
        assert!(!session.deck(DeckId::B).read().playing);
        assert!(session.pending_plan().is_none());
    }
}
