//! Ranking oracle seam.
//!
//! Smart-fill delegates candidate ordering to an external ranking service
//! (in production an LLM-backed recommender). The engine only depends on
//! this trait; a failure or malformed response is surfaced as an error the
//! queue scheduler absorbs, never a crash. [`CompatibilityOracle`] is the
//! built-in fallback that ranks purely by metadata compatibility.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use segue_core::{Track, TrackId};

use crate::compat::compatibility_score;

/// Errors surfaced by a ranking oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The backend could not be reached or timed out.
    #[error("ranking backend unavailable: {0}")]
    Unavailable(String),
    /// The backend answered with something structurally unusable.
    #[error("ranking response malformed: {0}")]
    Malformed(String),
}

/// One ranked recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTrack {
    pub track: TrackId,
    /// Human-readable reason for the placement.
    pub justification: String,
}

/// An ordered ranking over a candidate pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub entries: Vec<RankedTrack>,
}

/// Context handed to the oracle alongside the candidates.
#[derive(Debug, Clone, Default)]
pub struct RankContext {
    /// The track the recommendations should follow from (the queue's
    /// trailing track), when the queue is not empty.
    pub anchor: Option<Arc<Track>>,
    /// How many recommendations the caller wants.
    pub requested: usize,
}

/// External candidate-ranking service.
#[async_trait]
pub trait RankingOracle: Send + Sync {
    /// Rank `candidates` for playing after `context.anchor`.
    ///
    /// Implementations own their timeout/cancellation policy; callers only
    /// see success or failure, never a partial result.
    async fn rank(
        &self,
        candidates: &[Arc<Track>],
        context: RankContext,
    ) -> Result<Ranking, OracleError>;
}

/// Local oracle that ranks by metadata compatibility with the anchor.
///
/// Used when no external recommender is configured; with no anchor it
/// preserves the caller's candidate order.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompatibilityOracle;

#[async_trait]
impl RankingOracle for CompatibilityOracle {
    async fn rank(
        &self,
        candidates: &[Arc<Track>],
        context: RankContext,
    ) -> Result<Ranking, OracleError> {
        let mut scored: Vec<(u8, &Arc<Track>)> = candidates
            .iter()
            .map(|track| {
                let score = context
                    .anchor
                    .as_ref()
                    .map(|anchor| compatibility_score(anchor, track))
                    .unwrap_or(0);
                (score, track)
            })
            .collect();
        // Stable sort keeps the input order among equal scores.
        scored.sort_by(|(a, _), (b, _)| b.cmp(a));

        let take = if context.requested == 0 {
            scored.len()
        } else {
            context.requested.min(scored.len())
        };
        let entries = scored
            .into_iter()
            .take(take)
            .map(|(score, track)| RankedTrack {
                track: track.id,
                justification: match context.anchor.as_deref() {
                    Some(anchor) => format!(
                        "compatibility {}/100 with {}",
                        score,
                        anchor.display_name()
                    ),
                    None => "library order".to_string(),
                },
            })
            .collect();
        Ok(Ranking { entries })
    }
}
