// Individual pick representation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::snake;
use crate::error::DraftError;

// ---------------------------------------------------------------------------
// ESPN default position IDs (from ESPN Fantasy API v3, football)
// ---------------------------------------------------------------------------

pub const ESPN_POS_QB: u16 = 1;
pub const ESPN_POS_RB: u16 = 2;
pub const ESPN_POS_WR: u16 = 3;
pub const ESPN_POS_TE: u16 = 4;
pub const ESPN_POS_K: u16 = 5;
pub const ESPN_POS_DST: u16 = 16;

/// Football positions a drafted player can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Kicker,
    Defense,
}

impl Position {
    /// Map an ESPN `defaultPositionId` to a position.
    pub fn from_espn_id(id: u16) -> Option<Self> {
        match id {
            ESPN_POS_QB => Some(Position::Quarterback),
            ESPN_POS_RB => Some(Position::RunningBack),
            ESPN_POS_WR => Some(Position::WideReceiver),
            ESPN_POS_TE => Some(Position::TightEnd),
            ESPN_POS_K => Some(Position::Kicker),
            ESPN_POS_DST => Some(Position::Defense),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "D/ST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Opaque reference to the drafted player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    /// Source-assigned player ID.
    pub id: String,
    /// Display name, or a placeholder when the source didn't supply one.
    pub name: String,
    #[serde(default)]
    pub position: Option<Position>,
}

impl PlayerRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        PlayerRef {
            id: id.into(),
            name: name.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }
}

/// A finalized draft selection. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    /// Overall sequence number across the whole draft (1-indexed).
    pub overall: u32,
    /// Round containing this pick (1-indexed).
    pub round: u32,
    /// Position within the round (1-indexed).
    pub pick_in_round: u32,
    /// Draft position of the seat that made the pick.
    pub seat: u32,
    /// Identifier of the team that made the pick.
    pub team_id: String,
    /// Display name of the team; falls back to the ID.
    pub team_name: String,
    pub player: PlayerRef,
}

impl Pick {
    /// Build a pick, deriving round, pick-in-round and seat from the snake
    /// calculator.
    pub fn new(
        overall: u32,
        league_size: u32,
        team_id: impl Into<String>,
        player: PlayerRef,
    ) -> Result<Self, DraftError> {
        let team_id = team_id.into();
        Ok(Pick {
            overall,
            round: snake::round_of(overall, league_size)?,
            pick_in_round: snake::pick_in_round(overall, league_size)?,
            seat: snake::seat_at_pick(overall, league_size)?,
            team_name: team_id.clone(),
            team_id,
            player,
        })
    }

    pub fn with_team_name(mut self, team_name: impl Into<String>) -> Self {
        let name = team_name.into();
        if !name.is_empty() {
            self.team_name = name;
        }
        self
    }

    /// Short label such as `3.05` (round 3, fifth pick in the round).
    pub fn label(&self) -> String {
        format!("{}.{:02}", self.round, self.pick_in_round)
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} ({}) {} -> {}",
            self.overall,
            self.label(),
            self.player.name,
            self.team_name
        )?;
        if let Some(pos) = self.player.position {
            write!(f, " [{pos}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_derives_round_and_seat() {
        let pick = Pick::new(11, 10, "7", PlayerRef::new("4362628", "Ja'Marr Chase")).unwrap();
        assert_eq!(pick.round, 2);
        assert_eq!(pick.pick_in_round, 1);
        assert_eq!(pick.seat, 10);
        assert_eq!(pick.team_name, "7");
        assert_eq!(pick.label(), "2.01");
    }

    #[test]
    fn pick_rejects_zero_overall() {
        let err = Pick::new(0, 10, "1", PlayerRef::new("1", "Nobody")).unwrap_err();
        assert!(matches!(err, DraftError::InvalidArgument { field: "overall", .. }));
    }

    #[test]
    fn empty_team_name_keeps_id() {
        let pick = Pick::new(1, 8, "3", PlayerRef::new("1", "A")).unwrap().with_team_name("");
        assert_eq!(pick.team_name, "3");
        let pick = pick.with_team_name("Gridiron Gurus");
        assert_eq!(pick.team_name, "Gridiron Gurus");
    }

    #[test]
    fn display_includes_label_and_position() {
        let player = PlayerRef::new("3916387", "Lamar Jackson")
            .with_position(Position::from_espn_id(ESPN_POS_QB));
        let pick = Pick::new(24, 12, "5", player).unwrap().with_team_name("Ravens Fans");
        assert_eq!(pick.to_string(), "#24 (2.12) Lamar Jackson -> Ravens Fans [QB]");
    }

    #[test]
    fn espn_position_ids() {
        assert_eq!(Position::from_espn_id(ESPN_POS_RB), Some(Position::RunningBack));
        assert_eq!(Position::from_espn_id(ESPN_POS_DST), Some(Position::Defense));
        assert_eq!(Position::from_espn_id(7), None);
        assert_eq!(Position::Defense.to_string(), "D/ST");
    }
}
