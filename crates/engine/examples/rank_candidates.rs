//! Candidate ranking and smart fill.
//!
//! This example demonstrates:
//! - Scoring a candidate pool against the queue's trailing track
//! - Extending the queue through the built-in compatibility oracle
//!
//! Usage: cargo run --package segue-engine --example rank_candidates

use std::sync::Arc;

use segue_engine::{compatibility_score, CompatibilityOracle, PlayQueue};
use segue_core::{Track, TrackId, TrackType};

fn candidate(id: i64, title: &str, bpm: f64, camelot: &str, sub_genre: &str, energy: u8) -> Arc<Track> {
    let mut track = Track::new(TrackId(id), title);
    track.bpm = Some(bpm);
    track.camelot = Some(camelot.to_string());
    track.genre = Some("house".to_string());
    track.sub_genre = Some(sub_genre.to_string());
    track.energy = Some(energy);
    track.track_type = Some(TrackType::Instrumental);
    Arc::new(track)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut queue = PlayQueue::new();
    queue.add(candidate(1, "Anchor", 124.0, "8A", "deep house", 6));

    let pool = vec![
        candidate(10, "Close Match", 126.0, "8A", "deep house", 6),
        candidate(11, "Adjacent Key", 125.0, "9A", "deep house", 7),
        candidate(12, "Tempo Jump", 140.0, "8A", "tech house", 9),
        candidate(13, "Off Wheel", 118.0, "3B", "progressive house", 4),
    ];

    let anchor = queue.tracks().last().cloned().ok_or("empty queue")?;
    println!("Compatibility with {}:", anchor.display_name());
    println!("score | track");
    println!("------|------------------");
    for track in &pool {
        println!(
            "{:5} | {}",
            compatibility_score(&anchor, track),
            track.display_name()
        );
    }
    println!();

    let appended = queue
        .smart_fill(&pool, 3, true, &CompatibilityOracle)
        .await?;
    println!("smart fill appended {} tracks:", appended);
    for track in queue.tracks().iter().skip(1) {
        println!("  -> {}", track.display_name());
    }

    Ok(())
}
