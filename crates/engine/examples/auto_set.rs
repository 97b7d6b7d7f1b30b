//! Simulated auto-mix set.
//!
//! This example demonstrates:
//! - Queueing a short set of analyzed tracks
//! - Letting the planner pick phrase-aligned transitions
//! - Driving the session with a simulated clock and printing the
//!   crossfade weights as each handover runs
//!
//! Usage: cargo run --package segue-engine --example auto_set

use std::sync::Arc;

use segue_core::{SectionKind, SectionSpan, Track, TrackId};
use segue_engine::{MixSession, MixerEvent, PlayQueue, TransitionStyle};

fn demo_track(
    id: i64,
    title: &str,
    bpm: f64,
    camelot: &str,
    energy: u8,
    duration: f64,
) -> Arc<Track> {
    let mut track = Track::new(TrackId(id), title);
    track.bpm = Some(bpm);
    track.duration_seconds = Some(duration);
    track.camelot = Some(camelot.to_string());
    track.sub_genre = Some("melodic techno".to_string());
    track.energy = Some(energy);
    track
        .structure
        .push(SectionKind::Intro, SectionSpan::new(0.0, 30.0));
    track
        .structure
        .push(SectionKind::Breakdown, SectionSpan::new(duration * 0.5, duration * 0.5 + 30.0));
    track
        .structure
        .push(SectionKind::Outro, SectionSpan::at(duration - 60.0));
    Arc::new(track)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Segue Auto-Mix Example");
    println!("======================\n");

    let mut queue = PlayQueue::new();
    queue.add(demo_track(1, "Opening Theme", 122.0, "8A", 5, 360.0));
    queue.add(demo_track(2, "Rising Tide", 124.0, "9A", 6, 330.0));
    queue.add(demo_track(3, "Peak Hour", 126.0, "9B", 8, 300.0));

    for track in queue.tracks() {
        println!(
            "queued: {} ({:.0} bpm, {})",
            track.display_name(),
            track.bpm.unwrap_or_default(),
            track.camelot.as_deref().unwrap_or("?")
        );
    }
    println!();

    let (mut session, mut events) = MixSession::new(queue, TransitionStyle::default());
    session.start();

    // Drive the set with a 250 ms simulated clock until the queue runs dry.
    let mut clock = 0.0f64;
    'set: loop {
        session.tick(0.25);
        clock += 0.25;

        while let Ok(event) = events.try_recv() {
            match event {
                MixerEvent::TransitionPlanned { plan } => {
                    println!(
                        "[{:7.1}s] planned {} {} -> {}: exit {:.1}s, entry {:.1}s, {:.1}s {} fade",
                        clock,
                        plan.transition_type,
                        plan.source,
                        plan.target,
                        plan.exit_point,
                        plan.entry_point,
                        plan.duration_seconds,
                        plan.curve
                    );
                }
                MixerEvent::TransitionStarted { plan } => {
                    println!(
                        "[{:7.1}s] transition started ({} beats/phrase)",
                        clock,
                        plan.transition_type.phrase_beats()
                    );
                }
                MixerEvent::FadeProgress {
                    progress, weights, ..
                } => {
                    // Print a coarse trajectory, not every tick.
                    let percent = (progress * 100.0) as u32;
                    if percent % 25 == 0 {
                        println!(
                            "[{:7.1}s]   fade {:3}%  out {:.3}  in {:.3}",
                            clock, percent, weights.fade_out, weights.fade_in
                        );
                    }
                }
                MixerEvent::TransitionCompleted { now_live } => {
                    println!("[{:7.1}s] deck {} is live\n", clock, now_live);
                }
                MixerEvent::QueueExhausted => {
                    println!("[{:7.1}s] set finished.", clock);
                    break 'set;
                }
                MixerEvent::DeckStateChanged { .. } => {}
            }
        }
    }

    session.dispose();
    Ok(())
}
