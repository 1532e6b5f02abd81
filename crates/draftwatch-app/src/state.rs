// Monitor state: the high-water mark, the watched seat and its turn phase.
//
// Owned by the monitor's tick; nothing here touches timers or channels.

use draftwatch_core::draft::order::DraftOrder;
use draftwatch_core::draft::turn;
use draftwatch_core::protocol::{DraftSnapshot, WatchedSeat};
use draftwatch_core::DraftError;

/// Watched-seat sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    NotMyTurn,
    Approaching,
    /// On the clock at `overall`.
    MyTurn { overall: u32 },
}

impl TurnPhase {
    /// Whether a recommendation should be available in this phase.
    pub fn wants_recommendation(&self) -> bool {
        !matches!(self, TurnPhase::NotMyTurn)
    }
}

/// A phase change the monitor turns into an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTransition {
    Approaching {
        picks_until_turn: u32,
        next_overall: u32,
    },
    Started {
        overall: u32,
    },
    Ended {
        overall: u32,
    },
}

/// Outcome of one successful turn prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnStatus {
    pub seat: u32,
    pub league_size: u32,
    pub current_overall: u32,
    pub picks_until_turn: u32,
}

impl TurnStatus {
    /// The overall pick the watched seat makes next (the current one when
    /// it is on the clock).
    pub fn next_overall(&self) -> u32 {
        self.current_overall + self.picks_until_turn
    }
}

#[derive(Debug, Clone)]
pub struct MonitorState {
    last_processed: u32,
    phase: TurnPhase,
    league_size: Option<u32>,
    watched: WatchedSeat,
    tracking_halted: bool,
}

impl MonitorState {
    /// `league_size` pins the size; `None` adopts it from the first snapshot.
    pub fn new(watched: WatchedSeat, league_size: Option<u32>) -> Self {
        MonitorState {
            last_processed: 0,
            phase: TurnPhase::NotMyTurn,
            league_size,
            watched,
            tracking_halted: false,
        }
    }

    pub fn last_processed(&self) -> u32 {
        self.last_processed
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn league_size(&self) -> Option<u32> {
        self.league_size
    }

    pub fn watched(&self) -> &WatchedSeat {
        &self.watched
    }

    pub fn is_tracking_halted(&self) -> bool {
        self.tracking_halted
    }

    /// Raise the high-water mark. Never lowers it.
    pub fn advance_to(&mut self, high_water: u32) {
        self.last_processed = self.last_processed.max(high_water);
    }

    /// Switch the watched seat and reset the turn phase. Returns the turn
    /// that was cut short, if any. A tracking halt stays in place until the
    /// next prediction succeeds.
    pub fn set_watched_seat(&mut self, watched: WatchedSeat) -> Option<TurnTransition> {
        self.watched = watched;
        match std::mem::replace(&mut self.phase, TurnPhase::NotMyTurn) {
            TurnPhase::MyTurn { overall } => Some(TurnTransition::Ended { overall }),
            _ => None,
        }
    }

    /// Mark turn tracking halted. Returns `true` only on the first call
    /// since tracking last worked.
    pub fn halt_tracking(&mut self) -> bool {
        !std::mem::replace(&mut self.tracking_halted, true)
    }

    /// Mark turn tracking working. Returns `true` when it was halted.
    pub fn resume_tracking(&mut self) -> bool {
        std::mem::replace(&mut self.tracking_halted, false)
    }

    /// Predict the watched seat's distance from the clock.
    ///
    /// Adopts the snapshot's league size when none is pinned yet.
    pub fn predict(&mut self, snapshot: &DraftSnapshot) -> Result<TurnStatus, DraftError> {
        let league_size = match self.league_size {
            Some(size) if size != snapshot.league_size => {
                return Err(DraftError::InconsistentState {
                    message: format!(
                        "league size changed from {size} to {}",
                        snapshot.league_size
                    ),
                });
            }
            Some(size) => size,
            None => {
                if snapshot.league_size == 0 {
                    return Err(DraftError::InconsistentState {
                        message: "source reported an empty league".into(),
                    });
                }
                self.league_size = Some(snapshot.league_size);
                snapshot.league_size
            }
        };

        if snapshot.current_overall == 0 {
            return Err(DraftError::InconsistentState {
                message: "source reported no current pick".into(),
            });
        }

        let seat = self.resolve_seat(&snapshot.draft_order, league_size)?;
        let picks_until_turn =
            turn::picks_until_seat(snapshot.current_overall, league_size, seat)?;

        Ok(TurnStatus {
            seat,
            league_size,
            current_overall: snapshot.current_overall,
            picks_until_turn,
        })
    }

    fn resolve_seat(&self, order: &DraftOrder, league_size: u32) -> Result<u32, DraftError> {
        let seat = match &self.watched {
            WatchedSeat::Position(seat) => *seat,
            WatchedSeat::Team(team_id) => {
                if !order.is_empty() && order.len() != league_size as usize {
                    return Err(DraftError::InconsistentState {
                        message: format!(
                            "draft order lists {} teams for a {league_size}-team league",
                            order.len()
                        ),
                    });
                }
                order
                    .position_of(team_id)
                    .ok_or_else(|| DraftError::InconsistentState {
                        message: format!("team '{team_id}' is not in the draft order"),
                    })?
            }
        };
        if seat == 0 || seat > league_size {
            return Err(DraftError::InconsistentState {
                message: format!("seat {seat} is outside a {league_size}-team league"),
            });
        }
        Ok(seat)
    }

    /// Advance the turn phase for a fresh prediction and return the
    /// transitions in emission order. A `threshold` of 0 disables the
    /// approaching phase.
    pub fn apply_turn_status(
        &mut self,
        picks_until_turn: u32,
        current_overall: u32,
        threshold: u32,
    ) -> Vec<TurnTransition> {
        let mut transitions = Vec::new();

        if picks_until_turn == 0 {
            match self.phase {
                TurnPhase::MyTurn { overall } if overall == current_overall => {}
                TurnPhase::MyTurn { overall } => {
                    // Back-to-back picks at the end of a round.
                    transitions.push(TurnTransition::Ended { overall });
                    transitions.push(TurnTransition::Started {
                        overall: current_overall,
                    });
                }
                _ => transitions.push(TurnTransition::Started {
                    overall: current_overall,
                }),
            }
            self.phase = TurnPhase::MyTurn {
                overall: current_overall,
            };
        } else if picks_until_turn <= threshold {
            if let TurnPhase::MyTurn { overall } = self.phase {
                transitions.push(TurnTransition::Ended { overall });
            }
            if self.phase != TurnPhase::Approaching {
                transitions.push(TurnTransition::Approaching {
                    picks_until_turn,
                    next_overall: current_overall + picks_until_turn,
                });
            }
            self.phase = TurnPhase::Approaching;
        } else {
            if let TurnPhase::MyTurn { overall } = self.phase {
                transitions.push(TurnTransition::Ended { overall });
            }
            self.phase = TurnPhase::NotMyTurn;
        }

        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(league_size: u32, current_overall: u32) -> DraftSnapshot {
        DraftSnapshot {
            league_size,
            current_overall,
            ..DraftSnapshot::default()
        }
    }

    #[test]
    fn high_water_is_monotonic() {
        let mut state = MonitorState::new(WatchedSeat::Position(2), Some(8));
        state.advance_to(5);
        state.advance_to(3);
        assert_eq!(state.last_processed(), 5);
        state.advance_to(9);
        assert_eq!(state.last_processed(), 9);
    }

    #[test]
    fn full_turn_cycle() {
        let mut state = MonitorState::new(WatchedSeat::Position(2), Some(8));

        assert!(state.apply_turn_status(11, 4, 3).is_empty());
        assert_eq!(state.phase(), TurnPhase::NotMyTurn);

        assert_eq!(
            state.apply_turn_status(3, 12, 3),
            vec![TurnTransition::Approaching {
                picks_until_turn: 3,
                next_overall: 15
            }]
        );
        // Still approaching: no repeat.
        assert!(state.apply_turn_status(2, 13, 3).is_empty());

        assert_eq!(
            state.apply_turn_status(0, 15, 3),
            vec![TurnTransition::Started { overall: 15 }]
        );
        // Same pick observed again.
        assert!(state.apply_turn_status(0, 15, 3).is_empty());

        assert_eq!(
            state.apply_turn_status(12, 16, 3),
            vec![TurnTransition::Ended { overall: 15 }]
        );
        assert!(state.apply_turn_status(11, 17, 3).is_empty());
        assert_eq!(state.phase(), TurnPhase::NotMyTurn);
    }

    #[test]
    fn back_to_back_turns_end_then_start() {
        let mut state = MonitorState::new(WatchedSeat::Position(8), Some(8));
        assert_eq!(
            state.apply_turn_status(0, 8, 3),
            vec![TurnTransition::Started { overall: 8 }]
        );
        assert_eq!(
            state.apply_turn_status(0, 9, 3),
            vec![
                TurnTransition::Ended { overall: 8 },
                TurnTransition::Started { overall: 9 }
            ]
        );
    }

    #[test]
    fn turn_straight_into_approaching() {
        // Seat 7 of 8 picks 7, then 10 is only two picks away.
        let mut state = MonitorState::new(WatchedSeat::Position(7), Some(8));
        state.apply_turn_status(0, 7, 3);
        assert_eq!(
            state.apply_turn_status(2, 8, 3),
            vec![
                TurnTransition::Ended { overall: 7 },
                TurnTransition::Approaching {
                    picks_until_turn: 2,
                    next_overall: 10
                }
            ]
        );
    }

    #[test]
    fn zero_threshold_skips_approaching() {
        let mut state = MonitorState::new(WatchedSeat::Position(2), Some(8));
        assert!(state.apply_turn_status(1, 14, 0).is_empty());
        assert_eq!(
            state.apply_turn_status(0, 15, 0),
            vec![TurnTransition::Started { overall: 15 }]
        );
    }

    #[test]
    fn predict_adopts_league_size() {
        let mut state = MonitorState::new(WatchedSeat::Position(2), None);
        let status = state.predict(&snapshot(8, 3)).unwrap();
        assert_eq!(state.league_size(), Some(8));
        assert_eq!(status.picks_until_turn, 12);
        assert_eq!(status.next_overall(), 15);
    }

    #[test]
    fn predict_rejects_league_size_change() {
        let mut state = MonitorState::new(WatchedSeat::Position(2), Some(8));
        let err = state.predict(&snapshot(10, 3)).unwrap_err();
        assert!(matches!(err, DraftError::InconsistentState { .. }));
    }

    #[test]
    fn predict_rejects_seat_outside_league() {
        let mut state = MonitorState::new(WatchedSeat::Position(9), None);
        let err = state.predict(&snapshot(8, 3)).unwrap_err();
        assert!(matches!(err, DraftError::InconsistentState { .. }));
    }

    #[test]
    fn predict_resolves_team_through_order() {
        let mut state = MonitorState::new(WatchedSeat::Team("11".into()), None);
        let mut snap = snapshot(4, 1);
        snap.draft_order = DraftOrder::from_pick_order(["3", "11", "7", "2"]).unwrap();
        let status = state.predict(&snap).unwrap();
        assert_eq!(status.seat, 2);
        assert_eq!(status.picks_until_turn, 1);
    }

    #[test]
    fn predict_fails_for_unknown_team() {
        let mut state = MonitorState::new(WatchedSeat::Team("99".into()), None);
        let mut snap = snapshot(2, 1);
        snap.draft_order = DraftOrder::from_pick_order(["1", "2"]).unwrap();
        assert!(matches!(
            state.predict(&snap).unwrap_err(),
            DraftError::InconsistentState { .. }
        ));
    }

    #[test]
    fn halt_and_resume_report_edges_once() {
        let mut state = MonitorState::new(WatchedSeat::Position(1), Some(8));
        assert!(!state.resume_tracking());
        assert!(state.halt_tracking());
        assert!(!state.halt_tracking());
        assert!(state.is_tracking_halted());
        assert!(state.resume_tracking());
        assert!(!state.resume_tracking());
    }

    #[test]
    fn set_watched_seat_ends_active_turn() {
        let mut state = MonitorState::new(WatchedSeat::Position(1), Some(8));
        state.apply_turn_status(0, 1, 3);
        state.halt_tracking();
        assert_eq!(
            state.set_watched_seat(WatchedSeat::Position(4)),
            Some(TurnTransition::Ended { overall: 1 })
        );
        assert_eq!(state.phase(), TurnPhase::NotMyTurn);
        assert!(state.is_tracking_halted());
        assert_eq!(state.set_watched_seat(WatchedSeat::Position(5)), None);
    }
}
