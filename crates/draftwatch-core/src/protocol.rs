// Types exchanged between the monitor and its collaborators: the fetched
// draft snapshot, the events emitted to the notification layer, and the
// recommendation context/result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::order::DraftOrder;
use crate::draft::pick::Pick;

/// One wholesale fetch of the draft.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DraftSnapshot {
    /// Every completed pick the source reports, in any order.
    pub picks: Vec<Pick>,
    pub draft_order: DraftOrder,
    pub league_size: u32,
    /// The pick currently on the clock.
    pub current_overall: u32,
}

/// Which seat the monitor tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchedSeat {
    /// A fixed draft position.
    Position(u32),
    /// A team ID, resolved through the draft order on every tick.
    Team(String),
}

/// Composite cache key: the decision point (overall pick being decided)
/// and the seat it is decided for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecommendationKey {
    pub overall: u32,
    pub seat: u32,
}

/// Everything the recommendation engine gets to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationContext {
    pub key: RecommendationKey,
    pub league_size: u32,
    pub round: u32,
    pub pick_in_round: u32,
    /// Picks still to be made before the watched seat is on the clock.
    pub picks_until_turn: u32,
    /// Team ID holding the watched seat, when the draft order knows it.
    pub team_id: Option<String>,
    /// Picks the watched seat has already made, ascending.
    pub my_picks: Vec<Pick>,
    /// The most recent picks league-wide, ascending.
    pub recent_picks: Vec<Pick>,
}

/// Output of the recommendation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Overall pick the recommendation is for.
    pub overall: u32,
    pub text: String,
    pub generated_at: DateTime<Utc>,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Events emitted by the monitor, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A newly observed pick. Fired once per pick, strictly ascending.
    PickDetected(Pick),
    /// Picks were skipped over in the source data. `missing` lists the
    /// first few numbers; `missing_count` is the full count.
    GapDetected { missing: Vec<u32>, missing_count: u32 },
    /// The watched seat is within the warning threshold.
    TurnApproaching {
        picks_until_turn: u32,
        next_overall: u32,
    },
    /// The watched seat is on the clock. `recommendation` is `None` until
    /// the computation resolves; a `RecommendationReady` follows.
    MyTurnStarted {
        overall: u32,
        recommendation: Option<Recommendation>,
    },
    /// The watched seat's turn at `overall` is over.
    TurnEnded { overall: u32 },
    RecommendationReady {
        key: RecommendationKey,
        recommendation: Recommendation,
    },
    RecommendationFailed {
        key: RecommendationKey,
        message: String,
    },
    /// Turn prediction hit inconsistent data; picks keep flowing.
    TurnTrackingHalted { message: String },
    TurnTrackingResumed,
}
