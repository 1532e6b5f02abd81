// Draft order: the fixed bijection between teams and draft positions.

use serde::{Deserialize, Serialize};

use crate::error::DraftError;

/// Mapping from team identifier to draft position (`1..=len`).
///
/// Stored as a position-indexed list, so every position has exactly one
/// team; construction rejects duplicate teams and holes in the positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOrder {
    seats: Vec<String>,
}

impl DraftOrder {
    /// Build from a list of team IDs in draft order (first entry picks first).
    pub fn from_pick_order<I, S>(team_ids: I) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seats: Vec<String> = team_ids.into_iter().map(Into::into).collect();
        for (i, id) in seats.iter().enumerate() {
            if seats[..i].contains(id) {
                return Err(DraftError::inconsistent(format!(
                    "team '{id}' appears more than once in the draft order"
                )));
            }
        }
        Ok(DraftOrder { seats })
    }

    /// Build from explicit `(team_id, position)` pairs.
    pub fn from_positions<I, S>(entries: I) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, u32)> =
            entries.into_iter().map(|(id, pos)| (id.into(), pos)).collect();
        entries.sort_by_key(|(_, pos)| *pos);

        for (i, (id, pos)) in entries.iter().enumerate() {
            let expected = i as u32 + 1;
            if *pos != expected {
                return Err(DraftError::inconsistent(format!(
                    "draft position {expected} has no team (team '{id}' claims {pos})"
                )));
            }
        }
        Self::from_pick_order(entries.into_iter().map(|(id, _)| id))
    }

    /// Number of seats in the order.
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Draft position of `team_id`, if the team is in the order.
    pub fn position_of(&self, team_id: &str) -> Option<u32> {
        self.seats
            .iter()
            .position(|t| t == team_id)
            .map(|i| i as u32 + 1)
    }

    /// Team holding draft position `position`.
    pub fn team_at(&self, position: u32) -> Option<&str> {
        let idx = (position as usize).checked_sub(1)?;
        self.seats.get(idx).map(String::as_str)
    }

    /// `(team_id, position)` pairs in draft order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.seats
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i as u32 + 1))
    }
}
