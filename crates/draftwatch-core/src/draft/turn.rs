// Turn prediction: how many picks remain before a seat is on the clock.

use super::snake::seat_at_pick;
use crate::error::DraftError;

/// Upper bound on forward-simulation steps.
///
/// From mid-round, a seat near the front of the order waits for the rest of
/// the current round plus almost all of the next (seat 1 picks at 1 and then
/// at `2n`), so the search spans two full rounds rather than one.
pub fn max_search_steps(league_size: u32) -> u32 {
    league_size.saturating_mul(2)
}

/// Number of picks made before `target_seat` is on the clock, counting the
/// current pick. Returns 0 when the target holds `current_overall`.
///
/// Simulates forward through `seat_at_pick` rather than solving the snake
/// arithmetic in closed form, so it can never disagree with the seat
/// calculator at a round boundary.
pub fn picks_until_seat(
    current_overall: u32,
    league_size: u32,
    target_seat: u32,
) -> Result<u32, DraftError> {
    if target_seat == 0 || target_seat > league_size {
        return Err(DraftError::invalid(
            "target_seat",
            format!("must be within 1..={league_size}, got {target_seat}"),
        ));
    }

    if seat_at_pick(current_overall, league_size)? == target_seat {
        return Ok(0);
    }

    let bound = max_search_steps(league_size);
    let mut overall = current_overall;
    for steps in 1..=bound {
        overall = overall.checked_add(1).ok_or_else(|| {
            DraftError::inconsistent(format!(
                "pick counter overflowed searching for seat {target_seat}"
            ))
        })?;
        if seat_at_pick(overall, league_size)? == target_seat {
            return Ok(steps);
        }
    }

    Err(DraftError::inconsistent(format!(
        "seat {target_seat} not reached within {bound} picks of overall {current_overall} \
         (league size {league_size})"
    )))
}

/// Whether `target_seat` holds the current pick.
pub fn is_turn_active(
    current_overall: u32,
    league_size: u32,
    target_seat: u32,
) -> Result<bool, DraftError> {
    Ok(picks_until_seat(current_overall, league_size, target_seat)? == 0)
}

/// Overall number of the next pick (possibly the current one) owned by
/// `target_seat`.
pub fn next_pick_for_seat(
    current_overall: u32,
    league_size: u32,
    target_seat: u32,
) -> Result<u32, DraftError> {
    let until = picks_until_seat(current_overall, league_size, target_seat)?;
    Ok(current_overall + until)
}
