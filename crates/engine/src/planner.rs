//! Transition planning: what kind of transition to run between two tracks,
//! and when to run it.
//!
//! Exit points are quantized to musical phrase boundaries (multiples of
//! 8/16/32 beats from time zero) so a transition never starts mid-phrase.
//! Every lookup has a numeric fallback; a track with no bpm or no
//! structure still yields a complete, internally consistent plan.

use serde::{Deserialize, Serialize};

use segue_core::{SectionKind, StyleOverrides, Track, TrackId};

use crate::compat::compatibility_score;
use crate::crossfade::FadeCurve;

/// Exit fallback when neither bpm nor duration is known.
const DEFAULT_EXIT_SECONDS: f64 = 30.0;
/// Exit fallback from the end of the track when bpm is unknown.
const NO_BPM_END_OFFSET: f64 = 16.0;

/// How one track hands over to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// Hard swap on a phrase boundary, usually out of a drop.
    QuickCut,
    /// Long blended overlap for harmonically compatible tracks.
    Harmonic,
    /// Let the outgoing track decay while the next one builds.
    EchoOut,
}

impl TransitionType {
    /// Phrase length in beats used for exit-point quantization.
    pub fn phrase_beats(&self) -> u32 {
        match self {
            Self::QuickCut => 8,
            Self::Harmonic => 16,
            Self::EchoOut => 32,
        }
    }

    /// Offset from the end of the track used when no usable section exists.
    fn fallback_end_offset(&self) -> f64 {
        match self {
            Self::QuickCut => 16.0,
            Self::Harmonic => 24.0,
            Self::EchoOut => 32.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickCut => "quick_cut",
            Self::Harmonic => "harmonic",
            Self::EchoOut => "echo_out",
        }
    }
}

impl std::fmt::Display for TransitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller's transition choice: a concrete type, or let the planner pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRequest {
    #[default]
    Auto,
    Fixed(TransitionType),
}

/// Base parameters for one transition type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionParams {
    pub duration_seconds: f64,
    pub curve: FadeCurve,
    pub overlap_seconds: f64,
}

/// Per-type base parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionStyle {
    pub quick_cut: TransitionParams,
    pub harmonic: TransitionParams,
    pub echo_out: TransitionParams,
}

impl Default for TransitionStyle {
    fn default() -> Self {
        Self {
            quick_cut: TransitionParams {
                duration_seconds: 4.0,
                curve: FadeCurve::Linear,
                overlap_seconds: 2.0,
            },
            harmonic: TransitionParams {
                duration_seconds: 16.0,
                curve: FadeCurve::Sine,
                overlap_seconds: 12.0,
            },
            echo_out: TransitionParams {
                duration_seconds: 20.0,
                curve: FadeCurve::Exponential,
                overlap_seconds: 16.0,
            },
        }
    }
}

impl TransitionStyle {
    /// Base parameters for a transition type.
    pub fn params(&self, transition_type: TransitionType) -> TransitionParams {
        match transition_type {
            TransitionType::QuickCut => self.quick_cut,
            TransitionType::Harmonic => self.harmonic,
            TransitionType::EchoOut => self.echo_out,
        }
    }

    /// Apply user configuration on top of the defaults.
    pub fn with_overrides(mut self, overrides: &StyleOverrides) -> Self {
        for (params, over) in [
            (&mut self.quick_cut, &overrides.quick_cut),
            (&mut self.harmonic, &overrides.harmonic),
            (&mut self.echo_out, &overrides.echo_out),
        ] {
            if let Some(duration) = over.duration_seconds {
                params.duration_seconds = duration;
            }
            if let Some(overlap) = over.overlap_seconds {
                params.overlap_seconds = overlap;
            }
            if let Some(curve) = over.curve.as_deref() {
                params.curve = FadeCurve::parse(curve);
            }
        }
        self
    }
}

/// A complete transition decision for one track pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPlan {
    /// Track being played out.
    pub source: TrackId,
    /// Track being brought in.
    pub target: TrackId,
    pub transition_type: TransitionType,
    /// Seconds into the source track where the transition starts;
    /// phrase-aligned whenever the source bpm is known.
    pub exit_point: f64,
    /// Seconds into the target track where playback enters.
    pub entry_point: f64,
    /// Crossfade duration in seconds.
    pub duration_seconds: f64,
    pub curve: FadeCurve,
    /// Seconds both tracks are audible together.
    pub overlap_seconds: f64,
}

/// Pick a transition type from the pair's compatibility and complexity.
pub fn suggest_transition_type(current: &Track, next: &Track) -> TransitionType {
    let score = compatibility_score(current, next);
    if score >= 75 {
        return TransitionType::Harmonic;
    }

    let both_rhythmic = current.rhythmic_complexity.unwrap_or(0) >= 7
        && next.rhythmic_complexity.unwrap_or(0) >= 7;
    if both_rhythmic {
        return TransitionType::QuickCut;
    }

    let either_melodic =
        current.melodic_complexity.unwrap_or(0) >= 7 || next.melodic_complexity.unwrap_or(0) >= 7;
    if either_melodic {
        return TransitionType::EchoOut;
    }

    match (current.energy, next.energy) {
        (Some(energy_a), Some(energy_b)) => {
            let diff = (energy_a as i32 - energy_b as i32).abs();
            if diff >= 4 {
                TransitionType::QuickCut
            } else {
                // Close or moderate energy both blend fine.
                TransitionType::Harmonic
            }
        }
        _ => TransitionType::Harmonic,
    }
}

/// Compute a complete transition plan for a track pair.
///
/// Total over its inputs: missing bpm, duration, or structure never fails,
/// it only degrades to the documented fallbacks.
pub fn plan(
    current: &Track,
    next: &Track,
    request: TransitionRequest,
    style: &TransitionStyle,
) -> TransitionPlan {
    let transition_type = match request {
        TransitionRequest::Fixed(transition_type) => transition_type,
        TransitionRequest::Auto => suggest_transition_type(current, next),
    };
    let score = compatibility_score(current, next);

    let exit_point = exit_point(current, transition_type);
    let entry_point = entry_point(next, transition_type);

    let base = style.params(transition_type);
    let mut duration = base.duration_seconds;
    let mut overlap = base.overlap_seconds;

    // Tight pairs can transition faster; rough pairs need more room.
    if score >= 80 {
        duration *= 0.7;
    } else if score < 50 {
        duration *= 1.3;
    }

    // A large tempo gap stretches the fade but shortens the audible overlap.
    if let (Some(bpm_a), Some(bpm_b)) = (current.bpm, next.bpm) {
        if (bpm_a - bpm_b).abs() > 10.0 {
            duration *= 1.2;
            overlap = (overlap - 4.0).max(4.0);
        }
    }

    log::debug!(
        "planned {} transition {} -> {}: exit {:.2}s, entry {:.2}s, duration {:.2}s (score {})",
        transition_type,
        current.id,
        next.id,
        exit_point,
        entry_point,
        duration,
        score
    );

    TransitionPlan {
        source: current.id,
        target: next.id,
        transition_type,
        exit_point,
        entry_point,
        duration_seconds: duration,
        curve: base.curve,
        overlap_seconds: overlap,
    }
}

/// Quantize `t` down to the nearest phrase boundary.
fn align_to_phrase(t: f64, phrase_length: f64) -> f64 {
    if phrase_length <= 0.0 {
        return t.max(0.0);
    }
    (t.max(0.0) / phrase_length).floor() * phrase_length
}

/// Where to leave the current track, in seconds from time zero.
pub fn exit_point(track: &Track, transition_type: TransitionType) -> f64 {
    let structure = &track.structure;

    let Some(beat_interval) = track.beat_interval() else {
        // Without a tempo there is nothing to quantize against; leave a
        // fixed window before the end of the track instead.
        return match track.duration_seconds {
            Some(duration) => (duration - NO_BPM_END_OFFSET).max(0.0),
            None => DEFAULT_EXIT_SECONDS,
        };
    };
    let phrase_length = beat_interval * transition_type.phrase_beats() as f64;

    // Preferred structural moment per transition type.
    let preferred = match transition_type {
        TransitionType::QuickCut => structure.last(SectionKind::Drop).map(|span| span.start),
        TransitionType::EchoOut => structure
            .last(SectionKind::Breakdown)
            .map(|span| span.start)
            .or_else(|| structure.first(SectionKind::Outro).map(|span| span.start)),
        TransitionType::Harmonic => structure
            .last(SectionKind::Chorus)
            .map(|span| span.end.unwrap_or(span.start)),
    };

    // Shared fallback chain when the type-specific section is absent.
    let target = preferred
        .or_else(|| structure.first(SectionKind::Outro).map(|span| span.start))
        .or_else(|| structure.last(SectionKind::Breakdown).map(|span| span.start))
        .unwrap_or_else(|| match track.duration_seconds {
            Some(duration) => (duration - transition_type.fallback_end_offset()).max(0.0),
            None => DEFAULT_EXIT_SECONDS,
        });

    let aligned = align_to_phrase(target, phrase_length);
    match track.duration_seconds {
        Some(duration) => aligned.clamp(0.0, duration),
        None => aligned,
    }
}

/// Where to enter the next track, in seconds from time zero.
pub fn entry_point(track: &Track, transition_type: TransitionType) -> f64 {
    let structure = &track.structure;
    match transition_type {
        TransitionType::QuickCut => structure
            .first(SectionKind::Verse)
            .map(|span| span.start)
            .or_else(|| structure.first(SectionKind::Intro).and_then(|span| span.end))
            .unwrap_or(0.0),
        TransitionType::Harmonic => structure
            .first(SectionKind::Intro)
            .map(|span| span.start)
            .unwrap_or(0.0),
        TransitionType::EchoOut => structure
            .first(SectionKind::Intro)
            .map(|span| span.start)
            .or_else(|| structure.first(SectionKind::Verse).map(|span| span.start))
            .unwrap_or(0.0),
    }
}
