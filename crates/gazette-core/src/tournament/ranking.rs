//! Pure ranking logic for the batched tournament.
//!
//! Everything here is deterministic given its inputs (the judge responses
//! and any pre-shuffled orderings), which is what makes the engine
//! testable without a live model.

use rand::seq::SliceRandom;
use rand::Rng;

/// Labels are letters in insertion order: entrant 0 is A, 1 is B, ...
pub fn label_for(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Target group size for elimination rounds.
const GROUP_TARGET: usize = 15;

/// Split `n` entrants into groups of at most [`GROUP_TARGET`] with sizes
/// balanced within one of each other. Returns the group sizes in order.
pub fn partition_sizes(n: usize) -> Vec<usize> {
    let groups = n.div_ceil(GROUP_TARGET).max(1);
    let base = n / groups;
    let extra = n % groups;
    (0..groups)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Parse a judge response into a best-to-worst ordering of entrant
/// indices.
///
/// The ranking line is the first line containing comma-separated labels
/// where at least half of the expected labels appear; earlier lines are
/// preamble, later lines are optional explanation. Labels the judge
/// forgot are appended in random order at the tail. Returns `None` when
/// no line qualifies — the caller treats the group as shuffled.
pub fn parse_ranked_letters<R: Rng>(
    response: &str,
    expected: usize,
    rng: &mut R,
) -> Option<Vec<usize>> {
    for line in response.lines() {
        let mut order: Vec<usize> = Vec::new();
        for token in line.split(',') {
            let token = token
                .trim()
                .trim_matches(|c: char| !c.is_ascii_alphabetic());
            if token.len() != 1 {
                continue;
            }
            let c = token.chars().next().unwrap().to_ascii_uppercase();
            let index = (c as usize).wrapping_sub('A' as usize);
            if index < expected && !order.contains(&index) {
                order.push(index);
            }
        }

        if order.len() * 2 >= expected {
            let mut missing: Vec<usize> =
                (0..expected).filter(|i| !order.contains(i)).collect();
            missing.shuffle(rng);
            order.extend(missing);
            return Some(order);
        }
    }
    None
}

/// One elimination round's record: `tiers[t]` holds the entrants that
/// finished in intra-group position `t + 4`, across every group of the
/// round.
pub type RoundTiers<T> = Vec<Vec<T>>;

/// Flatten the tournament into a total order, best first.
///
/// Final-round entrants come first in their judged order. Elimination
/// rounds are consumed newest-first; within a round, position-4
/// finishers outrank position-5 finishers, and so on. Members of a tier
/// keep their arrival order, so the caller's shuffle is the tie-break
/// and the assigned ranks `1..=n` have no gaps or duplicates.
pub fn rank_order<T>(final_order: Vec<T>, rounds: Vec<RoundTiers<T>>) -> Vec<T> {
    let mut ordered = final_order;
    for round in rounds.into_iter().rev() {
        for tier in round {
            ordered.extend(tier);
        }
    }
    ordered
}
