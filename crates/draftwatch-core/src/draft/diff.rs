// New-pick detection over a wholesale re-fetched pick list.

use tracing::warn;

use super::pick::Pick;

/// How many skipped pick numbers a batch lists individually.
pub const MAX_LISTED_MISSING: usize = 64;

/// The picks from one fetch that have not been processed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickBatch {
    /// Unprocessed picks, ascending by `overall`, one per overall number.
    pub picks: Vec<Pick>,
    /// Whether at least one pick number between the previous high-water mark
    /// and the newest pick was never observed.
    pub has_gap: bool,
    /// The first skipped pick numbers, at most `MAX_LISTED_MISSING`.
    pub missing: Vec<u32>,
    /// Total count of skipped pick numbers, listed or not.
    pub missing_count: u32,
    /// Highest overall number in contiguous sequence from the previous
    /// high-water mark.
    pub contiguous_through: u32,
    /// Highest overall number in the batch, or the previous high-water mark
    /// when the batch is empty.
    pub high_water: u32,
}

impl PickBatch {
    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

/// Return the picks with `overall > last_processed`, sorted and deduplicated.
///
/// The input may be unsorted, repeat picks, or be transiently truncated.
/// A gap does not hold back the picks after it: they are emitted and the
/// batch is flagged so the caller can log it.
pub fn detect_new_picks(all_picks: &[Pick], last_processed: u32) -> PickBatch {
    let mut picks: Vec<Pick> = all_picks
        .iter()
        .filter(|p| p.overall > last_processed)
        .cloned()
        .collect();
    // Stable sort keeps the first copy of a repeated pick ahead of later ones.
    picks.sort_by_key(|p| p.overall);
    picks.dedup_by(|later, kept| {
        if later.overall != kept.overall {
            return false;
        }
        if later != kept {
            warn!(
                "Conflicting copies of pick #{}: keeping {} over {}",
                kept.overall, kept.player.name, later.player.name
            );
        }
        true
    });

    let mut missing = Vec::new();
    let mut missing_count: u32 = 0;
    let mut contiguous_through = last_processed;
    let mut expected = last_processed.saturating_add(1);
    for pick in &picks {
        if pick.overall == expected && missing_count == 0 {
            contiguous_through = pick.overall;
        }
        let skipped = pick.overall.saturating_sub(expected);
        if skipped > 0 {
            missing_count = missing_count.saturating_add(skipped);
            let room = MAX_LISTED_MISSING - missing.len();
            missing.extend((expected..pick.overall).take(room));
        }
        expected = pick.overall.saturating_add(1);
    }

    let high_water = picks.last().map_or(last_processed, |p| p.overall);

    PickBatch {
        has_gap: missing_count > 0,
        picks,
        missing,
        missing_count,
        contiguous_through,
        high_water,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::pick::PlayerRef;

    fn pick(overall: u32) -> Pick {
        Pick::new(
            overall,
            8,
            format!("{}", crate::draft::snake::seat_at_pick(overall, 8).unwrap()),
            PlayerRef::new(format!("p{overall}"), format!("Player {overall}")),
        )
        .unwrap()
    }

    fn overalls(batch: &PickBatch) -> Vec<u32> {
        batch.picks.iter().map(|p| p.overall).collect()
    }

    #[test]
    fn first_fetch_returns_everything_in_order() {
        let batch = detect_new_picks(&[pick(1), pick(2), pick(3)], 0);
        assert_eq!(overalls(&batch), vec![1, 2, 3]);
        assert!(!batch.has_gap);
        assert_eq!(batch.high_water, 3);
        assert_eq!(batch.contiguous_through, 3);
    }

    #[test]
    fn refetch_of_seen_picks_is_empty() {
        let all = [pick(1), pick(2), pick(3)];
        let first = detect_new_picks(&all, 0);
        let second = detect_new_picks(&all, first.high_water);
        assert!(second.is_empty());
        assert_eq!(second.high_water, 3);
        assert!(!second.has_gap);
    }

    #[test]
    fn idempotent_for_same_inputs() {
        let all = [pick(4), pick(2), pick(3), pick(5)];
        assert_eq!(detect_new_picks(&all, 2), detect_new_picks(&all, 2));
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let batch = detect_new_picks(&[pick(5), pick(3), pick(4), pick(1), pick(2)], 2);
        assert_eq!(overalls(&batch), vec![3, 4, 5]);
    }

    #[test]
    fn duplicates_collapse_to_first_copy() {
        let mut dup = pick(2);
        dup.player.name = "Late Copy".into();
        let batch = detect_new_picks(&[pick(1), pick(2), dup, pick(2), pick(3)], 0);
        assert_eq!(overalls(&batch), vec![1, 2, 3]);
        assert_eq!(batch.picks[1].player.name, "Player 2");
    }

    #[test]
    fn gap_is_flagged_but_not_blocking() {
        let batch = detect_new_picks(&[pick(5), pick(7), pick(8)], 5);
        assert_eq!(overalls(&batch), vec![7, 8]);
        assert!(batch.has_gap);
        assert_eq!(batch.missing, vec![6]);
        assert_eq!(batch.missing_count, 1);
        assert_eq!(batch.contiguous_through, 5);
        assert_eq!(batch.high_water, 8);
    }

    #[test]
    fn gap_after_contiguous_run() {
        let batch = detect_new_picks(&[pick(1), pick(2), pick(5)], 0);
        assert_eq!(batch.missing, vec![3, 4]);
        assert_eq!(batch.contiguous_through, 2);
        assert_eq!(batch.high_water, 5);
    }

    #[test]
    fn huge_gap_lists_only_the_first_numbers() {
        let batch = detect_new_picks(&[pick(20_000_001)], 0);
        assert_eq!(overalls(&batch), vec![20_000_001]);
        assert!(batch.has_gap);
        assert_eq!(batch.missing_count, 20_000_000);
        assert_eq!(batch.missing.len(), MAX_LISTED_MISSING);
        assert_eq!(batch.missing[0], 1);
        assert_eq!(batch.missing[MAX_LISTED_MISSING - 1], 64);
    }

    #[test]
    fn pick_at_u32_max_does_not_overflow() {
        let batch = detect_new_picks(&[pick(u32::MAX)], u32::MAX - 1);
        assert_eq!(overalls(&batch), vec![u32::MAX]);
        assert!(!batch.has_gap);
        assert_eq!(batch.high_water, u32::MAX);
    }

    #[test]
    fn truncated_list_returns_nothing_new() {
        // Source transiently returns fewer picks than already processed.
        let batch = detect_new_picks(&[pick(1), pick(2)], 6);
        assert!(batch.is_empty());
        assert_eq!(batch.high_water, 6);
        assert!(!batch.has_gap);
    }

    #[test]
    fn empty_input() {
        let batch = detect_new_picks(&[], 0);
        assert!(batch.is_empty());
        assert_eq!(batch.high_water, 0);
        assert_eq!(batch.contiguous_through, 0);
    }
}
