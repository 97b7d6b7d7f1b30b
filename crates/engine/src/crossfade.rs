//! Crossfade curve family and transition progress state.
//!
//! A curve maps transition progress in [0, 1] to independent fade-out /
//! fade-in loudness weights. The non-linear curves intentionally do not
//! sum to 1 at interior progress values; the playback layer applies the
//! weights as-is.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Deserializer, Serialize};

/// Crossfade curve type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    Linear,
    #[default]
    Sine,
    Exponential,
    Logarithmic,
}

impl FadeCurve {
    /// Parse a curve name. Unrecognized names fall back to [`Sine`],
    /// the neutral default.
    ///
    /// [`Sine`]: FadeCurve::Sine
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Self::Linear,
            "sine" => Self::Sine,
            "exponential" => Self::Exponential,
            "logarithmic" => Self::Logarithmic,
            _ => Self::Sine,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Sine => "sine",
            Self::Exponential => "exponential",
            Self::Logarithmic => "logarithmic",
        }
    }

    /// Fade weights at `progress` ∈ [0, 1]; values outside are clamped.
    ///
    /// Every curve starts at `(1, 0)` and ends at `(0, 1)` exactly.
    pub fn weights(self, progress: f64) -> FadeWeights {
        if progress <= 0.0 {
            return FadeWeights {
                fade_out: 1.0,
                fade_in: 0.0,
            };
        }
        if progress >= 1.0 {
            return FadeWeights {
                fade_out: 0.0,
                fade_in: 1.0,
            };
        }
        let t = progress;
        match self {
            Self::Linear => FadeWeights {
                fade_out: 1.0 - t,
                fade_in: t,
            },
            Self::Sine => FadeWeights {
                fade_out: (t * FRAC_PI_2).cos(),
                fade_in: (t * FRAC_PI_2).sin(),
            },
            Self::Exponential => FadeWeights {
                fade_out: (1.0 - t) * (1.0 - t),
                fade_in: t.sqrt(),
            },
            Self::Logarithmic => FadeWeights {
                fade_out: (1.0 - t).sqrt(),
                fade_in: t * t,
            },
        }
    }
}

// Unknown curve names behave as sine rather than failing the whole
// document, so config files stay forward-compatible.
impl<'de> Deserialize<'de> for FadeCurve {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent loudness weights for the outgoing and incoming tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeWeights {
    /// Weight applied to the outgoing track, 1 → 0 over the transition.
    pub fade_out: f64,
    /// Weight applied to the incoming track, 0 → 1 over the transition.
    pub fade_in: f64,
}

impl FadeWeights {
    /// Weights for a deck playing solo (no transition running).
    pub const IDLE: Self = Self {
        fade_out: 1.0,
        fade_in: 0.0,
    };

    /// Weights once a transition has fully landed.
    pub const COMPLETE: Self = Self {
        fade_out: 0.0,
        fade_in: 1.0,
    };
}

/// Progress state of one crossfade.
///
/// `advance` is allocation-free; the session calls it once per tick with
/// the elapsed wall/playback time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CrossfadeState {
    #[default]
    Idle,
    Fading {
        curve: FadeCurve,
        duration_seconds: f64,
        elapsed_seconds: f64,
    },
    Complete,
}

impl CrossfadeState {
    /// Begin a crossfade. A non-positive duration completes immediately.
    pub fn start(curve: FadeCurve, duration_seconds: f64) -> Self {
        if duration_seconds <= 0.0 {
            return Self::Complete;
        }
        Self::Fading {
            curve,
            duration_seconds,
            elapsed_seconds: 0.0,
        }
    }

    /// Advance by `dt` seconds and return the weights at the new position.
    pub fn advance(&mut self, dt: f64) -> FadeWeights {
        match self {
            Self::Fading {
                curve,
                duration_seconds,
                elapsed_seconds,
            } => {
                *elapsed_seconds = (*elapsed_seconds + dt.max(0.0)).min(*duration_seconds);
                let progress = *elapsed_seconds / *duration_seconds;
                let weights = curve.weights(progress);
                if progress >= 1.0 {
                    *self = Self::Complete;
                }
                weights
            }
            Self::Idle => FadeWeights::IDLE,
            Self::Complete => FadeWeights::COMPLETE,
        }
    }

    /// Current progress in [0, 1], or `None` when not fading.
    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Fading {
                duration_seconds,
                elapsed_seconds,
                ..
            } => Some(elapsed_seconds / duration_seconds),
            _ => None,
        }
    }

    /// Weights at the current position without advancing.
    pub fn weights(&self) -> FadeWeights {
        match self {
            Self::Fading {
                curve,
                duration_seconds,
                elapsed_seconds,
            } => curve.weights(elapsed_seconds / duration_seconds),
            Self::Idle => FadeWeights::IDLE,
            Self::Complete => FadeWeights::COMPLETE,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_fading(&self) -> bool {
        matches!(self, Self::Fading { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Reset back to `Idle` after the session has handled `Complete`.
    pub fn reset(&mut self) {
        *self = Self::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CURVES: [FadeCurve; 4] = [
        FadeCurve::Linear,
        FadeCurve::Sine,
        FadeCurve::Exponential,
        FadeCurve::Logarithmic,
    ];

    #[test]
    fn endpoints_are_exact_for_every_curve() {
        for curve in ALL_CURVES {
            let start = curve.weights(0.0);
            assert_eq!(start.fade_out, 1.0, "{curve} out at t=0");
            assert_eq!(start.fade_in, 0.0, "{curve} in at t=0");

            let end = curve.weights(1.0);
            assert_eq!(end.fade_out, 0.0, "{curve} out at t=1");
            assert_eq!(end.fade_in, 1.0, "{curve} in at t=1");
        }
    }

    #[test]
    fn linear_midpoint_is_half_half() {
        let mid = FadeCurve::Linear.weights(0.5);
        assert!((mid.fade_out - 0.5).abs() < 1e-12);
        assert!((mid.fade_in - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sine_midpoint_exceeds_unity_sum() {
        // The equal-gain property is intentionally not held: at the
        // midpoint both weights are cos(π/4) ≈ 0.707.
        let mid = FadeCurve::Sine.weights(0.5);
        assert!((mid.fade_out - mid.fade_in).abs() < 1e-12);
        assert!(mid.fade_out + mid.fade_in > 1.0);
    }

    #[test]
    fn exponential_and_logarithmic_shapes() {
        let exp = FadeCurve::Exponential.weights(0.5);
        assert!((exp.fade_out - 0.25).abs() < 1e-12);
        assert!((exp.fade_in - 0.5_f64.sqrt()).abs() < 1e-12);

        let log = FadeCurve::Logarithmic.weights(0.5);
        assert!((log.fade_out - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((log.fade_in - 0.25).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        for curve in ALL_CURVES {
            assert_eq!(curve.weights(-0.5), curve.weights(0.0));
            assert_eq!(curve.weights(1.5), curve.weights(1.0));
        }
    }

    #[test]
    fn weights_stay_in_unit_interval() {
        for curve in ALL_CURVES {
            for step in 0..=20 {
                let w = curve.weights(step as f64 / 20.0);
                assert!((0.0..=1.0).contains(&w.fade_out), "{curve} out");
                assert!((0.0..=1.0).contains(&w.fade_in), "{curve} in");
            }
        }
    }

    #[test]
    fn unknown_curve_name_parses_as_sine() {
        assert_eq!(FadeCurve::parse("sine"), FadeCurve::Sine);
        assert_eq!(FadeCurve::parse("LINEAR"), FadeCurve::Linear);
        assert_eq!(FadeCurve::parse("s-curve"), FadeCurve::Sine);
        assert_eq!(FadeCurve::parse(""), FadeCurve::Sine);

        let parsed: FadeCurve = serde_json::from_str("\"constant_power\"").unwrap();
        assert_eq!(parsed, FadeCurve::Sine);
    }

    #[test]
    fn state_advances_to_complete() {
        let mut state = CrossfadeState::start(FadeCurve::Linear, 4.0);
        assert!(state.is_fading());

        let w = state.advance(1.0);
        assert!((w.fade_out - 0.75).abs() < 1e-12);
        assert!((state.progress().unwrap() - 0.25).abs() < 1e-12);

        let w = state.advance(3.0);
        assert_eq!(w, FadeWeights::COMPLETE);
        assert!(state.is_complete());

        // Further advances stay complete.
        assert_eq!(state.advance(1.0), FadeWeights::COMPLETE);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let state = CrossfadeState::start(FadeCurve::Sine, 0.0);
        assert!(state.is_complete());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut state = CrossfadeState::start(FadeCurve::Linear, 0.0);
        assert!(state.is_complete());
        state.reset();
        assert!(state.is_idle());
        assert_eq!(state.weights(), FadeWeights::IDLE);
    }
}
