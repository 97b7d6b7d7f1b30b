//! Segue auto-mix engine.
//!
//! Decision-and-timing logic for automated DJ mixing over two decks:
//!
//! - Pairwise compatibility scoring from declared track metadata
//! - Phrase-aligned transition planning (exit/entry points, fade
//!   parameters) keyed to musical structure
//! - A crossfade curve family mapping transition progress to fade weights
//! - A cancellable periodic beat/tempo sync monitor for the deck pair
//! - An ordered play queue with oracle-backed smart fill
//!
//! The engine consumes pre-computed metadata only. Audio decoding,
//! playback, and output live in the surrounding application; this crate
//! emits decisions (`TransitionPlan`, `FadeWeights`, `SyncReading`) for
//! the playback layer to apply.

pub mod compat;
pub mod crossfade;
pub mod oracle;
pub mod planner;
pub mod queue;
pub mod session;
pub mod sync;

// Re-export main types
pub use compat::compatibility_score;
pub use crossfade::{CrossfadeState, FadeCurve, FadeWeights};
pub use oracle::{CompatibilityOracle, OracleError, RankContext, RankedTrack, Ranking, RankingOracle};
pub use planner::{
    plan, suggest_transition_type, TransitionParams, TransitionPlan, TransitionRequest,
    TransitionStyle, TransitionType,
};
pub use queue::{PlayQueue, QueueError};
pub use session::{MixSession, MixerCommand, MixerEvent};
pub use sync::{read_decks, DeckSyncMonitor, SyncReading, SyncStatus};
