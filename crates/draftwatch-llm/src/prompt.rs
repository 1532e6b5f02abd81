// Prompt templates for snake-draft pick recommendations.
//
// The prompt carries pre-computed draft position numbers so the model
// spends its tokens on roster construction rather than arithmetic.

use std::fmt::Write;

use draftwatch_core::draft::pick::{Pick, Position};
use draftwatch_core::protocol::RecommendationContext;

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Return the static system prompt for all recommendation calls.
pub fn system_prompt() -> String {
    "You are a fantasy football snake draft advisor.\n\
     \n\
     You will be told which overall pick the user is about to make, how many picks \
     remain before it, what the user has drafted so far, and what the rest of the \
     league has taken most recently.\n\
     \n\
     Respond with:\n\
     1. TARGETS: Up to three players to take at this pick, best first, with position.\n\
     2. WHY: One line per target on roster fit and positional runs.\n\
     3. NEXT TURN: What is likely to still be there at the user's following pick.\n\
     \n\
     Be concise and direct. Use the numbers provided; do not recompute them."
        .to_string()
}

// ---------------------------------------------------------------------------
// Recommendation prompt
// ---------------------------------------------------------------------------

/// Build the user prompt for one decision point.
pub fn build_recommendation_prompt(ctx: &RecommendationContext) -> String {
    let mut prompt = String::with_capacity(1024);

    // Section 1: DECISION POINT
    let _ = write!(
        prompt,
        "## DECISION POINT\n\
         Pick: #{} (round {}, pick {} of {})\n\
         Draft slot: {}\n",
        ctx.key.overall, ctx.round, ctx.pick_in_round, ctx.league_size, ctx.key.seat,
    );
    if ctx.picks_until_turn == 0 {
        prompt.push_str("Status: ON THE CLOCK\n\n");
    } else {
        let _ = writeln!(
            prompt,
            "Status: {} pick{} before mine\n",
            ctx.picks_until_turn,
            if ctx.picks_until_turn == 1 { "" } else { "s" },
        );
    }

    // Section 2: MY ROSTER
    prompt.push_str("## MY ROSTER\n");
    prompt.push_str(&format_my_picks(&ctx.my_picks));
    prompt.push('\n');

    // Section 3: RECENT PICKS
    prompt.push_str("## RECENT PICKS\n");
    if ctx.recent_picks.is_empty() {
        prompt.push_str("(draft has not started)\n");
    } else {
        for pick in &ctx.recent_picks {
            let _ = writeln!(prompt, "- {}", format_pick_line(pick));
        }
    }

    prompt
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One pick as `2.04 Lamar Jackson QB (Ravens Fans)`.
fn format_pick_line(pick: &Pick) -> String {
    let pos = pick.player.position.map_or("?", |p| p.display_str());
    format!(
        "{} {} {} ({})",
        pick.label(),
        pick.player.name,
        pos,
        pick.team_name
    )
}

/// The watched seat's picks followed by a per-position count.
pub fn format_my_picks(picks: &[Pick]) -> String {
    if picks.is_empty() {
        return "(no picks yet)\n".to_string();
    }
    let mut out = String::new();
    for pick in picks {
        let _ = writeln!(out, "- {}", format_pick_line(pick));
    }

    let counts: Vec<String> = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Kicker,
        Position::Defense,
    ]
    .iter()
    .map(|pos| {
        let n = picks
            .iter()
            .filter(|p| p.player.position == Some(*pos))
            .count();
        format!("{} {}", pos.display_str(), n)
    })
    .collect();
    let _ = writeln!(out, "Counts: {}", counts.join(" | "));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
