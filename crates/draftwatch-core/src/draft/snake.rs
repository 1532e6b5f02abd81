// Snake-order arithmetic: which seat holds a given overall pick.
//
// Every other component derives seat information through `seat_at_pick`;
// nothing else re-implements the round-parity reversal.

use crate::error::DraftError;

fn validate(overall: u32, league_size: u32) -> Result<(), DraftError> {
    if league_size == 0 {
        return Err(DraftError::invalid("league_size", "must be >= 1, got 0"));
    }
    if overall == 0 {
        return Err(DraftError::invalid("overall", "must be >= 1, got 0"));
    }
    Ok(())
}

/// Round containing `overall` (1-based): `ceil(overall / league_size)`.
pub fn round_of(overall: u32, league_size: u32) -> Result<u32, DraftError> {
    validate(overall, league_size)?;
    Ok((overall - 1) / league_size + 1)
}

/// Position of `overall` within its round (1-based):
/// `((overall - 1) mod league_size) + 1`.
pub fn pick_in_round(overall: u32, league_size: u32) -> Result<u32, DraftError> {
    validate(overall, league_size)?;
    Ok((overall - 1) % league_size + 1)
}

/// Seat (draft position `1..=league_size`) on the clock for `overall`.
///
/// Odd rounds run forward, even rounds run in reverse, so the last seat of
/// round one also opens round two.
pub fn seat_at_pick(overall: u32, league_size: u32) -> Result<u32, DraftError> {
    let round = round_of(overall, league_size)?;
    let in_round = pick_in_round(overall, league_size)?;
    if round % 2 == 0 {
        Ok(league_size - in_round + 1)
    } else {
        Ok(in_round)
    }
}
