//! End-to-end session test: queue a short set, drive the session with a
//! simulated clock, and watch a full phrase-aligned handover.

use std::sync::Arc;

use async_trait::async_trait;
use segue_core::{DeckId, SectionKind, SectionSpan, Track, TrackId};
use segue_engine::{
    DeckSyncMonitor, MixSession, MixerEvent, OracleError, PlayQueue, QueueError, RankContext,
    Ranking, RankingOracle, TransitionStyle,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn club_track(id: i64, bpm: f64, duration: f64) -> Arc<Track> {
    let mut track = Track::new(TrackId(id), format!("Track {}", id));
    track.bpm = Some(bpm);
    track.duration_seconds = Some(duration);
    track.camelot = Some("8A".to_string());
    track.sub_genre = Some("deep house".to_string());
    track.energy = Some(6);
    track
        .structure
        .push(SectionKind::Intro, SectionSpan::new(0.0, 16.0));
    track
        .structure
        .push(SectionKind::Verse, SectionSpan::new(16.0, 48.0));
    track
        .structure
        .push(SectionKind::Outro, SectionSpan::at(duration - 32.0));
    Arc::new(track)
}

struct DeadOracle;

#[async_trait]
impl RankingOracle for DeadOracle {
    async fn rank(
        &self,
        _candidates: &[Arc<Track>],
        _context: RankContext,
    ) -> Result<Ranking, OracleError> {
        Err(OracleError::Unavailable("backend offline".to_string()))
    }
}

#[test]
fn simulated_set_hands_over_between_decks() {
    init_logging();

    let mut queue = PlayQueue::new();
    queue.add(club_track(1, 124.0, 300.0));
    queue.add(club_track(2, 126.0, 300.0));

    let (mut session, mut rx) = MixSession::new(queue, TransitionStyle::default());
    session.start();

    let plan = session.pending_plan().expect("a plan for the pair").clone();
    // Matched metadata: harmonic transition out of the outro, aligned to
    // 16-beat phrases.
    let phrase = (60.0 / 124.0) * 16.0;
    let remainder = plan.exit_point.rem_euclid(phrase);
    assert!(
        remainder < 1e-9 || (phrase - remainder) < 1e-9,
        "exit point {} not phrase aligned",
        plan.exit_point
    );
    assert!(plan.exit_point <= 300.0);

    // Drive the session in 100 ms steps until well past the transition.
    let total_ticks = ((plan.exit_point + plan.duration_seconds + 5.0) / 0.1) as usize;
    for _ in 0..total_ticks {
        session.tick(0.1);
        // Keep the event queue drained so nothing is dropped.
        while rx.try_recv().is_ok() {}
    }

    assert!(!session.is_transitioning());
    assert_eq!(session.live_deck(), DeckId::B);
    assert_eq!(session.queue().current_track().unwrap().id, TrackId(2));
    assert!(session.deck(DeckId::B).read().playing);
    assert!(!session.deck(DeckId::A).read().playing);
}

#[test]
fn fade_weights_traverse_from_out_to_in() {
    init_logging();

    let mut queue = PlayQueue::new();
    queue.add(club_track(1, 124.0, 300.0));
    queue.add(club_track(2, 126.0, 300.0));

    let (mut session, mut rx) = MixSession::new(queue, TransitionStyle::default());
    session.start();
    let plan = session.pending_plan().unwrap().clone();

    // Jump to the exit point, then collect the fade trajectory.
    session.tick(plan.exit_point);
    while rx.try_recv().is_ok() {}

    let mut weights = Vec::new();
    let ticks = (plan.duration_seconds / 0.5).ceil() as usize + 1;
    for _ in 0..ticks {
        session.tick(0.5);
        while let Ok(event) = rx.try_recv() {
            if let MixerEvent::FadeProgress { weights: w, .. } = event {
                weights.push(w);
            }
        }
    }

    assert!(weights.len() >= 2, "expected fade progress events");
    let last = weights.last().unwrap();
    assert!((last.fade_out - 0.0).abs() < 1e-9);
    assert!((last.fade_in - 1.0).abs() < 1e-9);
    // Fade-out never increases, fade-in never decreases.
    for pair in weights.windows(2) {
        assert!(pair[1].fade_out <= pair[0].fade_out + 1e-9);
        assert!(pair[1].fade_in >= pair[0].fade_in - 1e-9);
    }
}

#[tokio::test(start_paused = true)]
async fn sync_monitor_tracks_session_decks() {
    init_logging();

    let mut queue = PlayQueue::new();
    queue.add(club_track(1, 124.0, 300.0));
    queue.add(club_track(2, 124.0, 300.0));

    let (mut session, _rx) = MixSession::new(queue, TransitionStyle::default());
    session.start();

    let mut monitor = DeckSyncMonitor::new(
        Arc::clone(session.deck(DeckId::A)),
        Arc::clone(session.deck(DeckId::B)),
    );
    let mut readings = monitor.subscribe();
    monitor.start();

    // Only deck A is loaded so far: no sync data.
    readings.changed().await.unwrap();
    assert!(readings.borrow().status().is_none());

    // Bring deck B in at the same tempo on a beat boundary.
    {
        let deck_a = session.deck(DeckId::A);
        let mut deck_a = deck_a.write();
        deck_a.elapsed_seconds = 60.0 / 124.0 * 64.0;
    }
    {
        let track = club_track(3, 124.0, 300.0);
        let deck_b = session.deck(DeckId::B);
        let mut deck_b = deck_b.write();
        deck_b.load(track);
        deck_b.playing = true;
    }

    readings.changed().await.unwrap();
    let status = *readings.borrow();
    let status = status.status().copied().expect("sync data");
    assert!(status.synced, "same tempo on the beat should be synced");
    assert!(status.phase_difference <= 0.5);

    monitor.stop();
}

#[tokio::test]
async fn smart_fill_failure_is_contained() {
    init_logging();

    let mut queue = PlayQueue::new();
    queue.add(club_track(1, 124.0, 300.0));
    queue.add(club_track(2, 126.0, 300.0));
    let before: Vec<TrackId> = queue.tracks().iter().map(|t| t.id).collect();

    let candidates = vec![club_track(10, 125.0, 280.0), club_track(11, 140.0, 280.0)];
    let err = queue
        .smart_fill(&candidates, 2, true, &DeadOracle)
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::RecommendationUnavailable { .. }));

    let after: Vec<TrackId> = queue.tracks().iter().map(|t| t.id).collect();
    assert_eq!(before, after, "queue must be untouched on oracle failure");
}
