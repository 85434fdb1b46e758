//! The front-page selection algorithm.
//!
//! Pure over its inputs: given the candidate headlines (already scoped to
//! the right days) and a random source, pick up to four headlines backed
//! by four distinct stories. Randomness is injected so tests can seed it.

use crate::model::Headline;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Slots on the front page.
pub const FRONT_PAGE_SLOTS: usize = 4;

/// Pool prefixes tried, in order, for the random slots.
const EXPANDING_POOLS: [usize; 4] = [16, 16, 32, 64];

/// Sort headlines by the chosen rank field, ascending; absent ranks sort
/// after all present ranks, stable within each group.
pub fn sort_by_rank(headlines: &mut [Headline], use_cross_day: bool) {
    headlines.sort_by_key(|h| rank_value(h, use_cross_day));
}

fn rank_value(headline: &Headline, use_cross_day: bool) -> i64 {
    let rank = if use_cross_day {
        headline.cross_day_rank
    } else {
        headline.rank
    };
    rank.unwrap_or(i64::MAX)
}

/// Select up to four headlines with distinct stories.
///
/// `sorted` must already be ordered by [`sort_by_rank`]. A matching
/// `slug` is pinned into slot 0; otherwise the best unseen headline
/// leads. A `query` fills remaining slots from shuffled matches before
/// the expanding random pools take over.
pub fn select_headlines<R: Rng>(
    sorted: &[Headline],
    slug: Option<&str>,
    query: Option<&str>,
    seen: &HashSet<String>,
    rng: &mut R,
) -> Vec<Headline> {
    let mut slots: Vec<Headline> = Vec::with_capacity(FRONT_PAGE_SLOTS);
    let mut claimed_stories: HashSet<String> = HashSet::new();
    let mut claimed_ids: HashSet<String> = HashSet::new();

    let claim = |h: &Headline,
                     slots: &mut Vec<Headline>,
                     claimed_stories: &mut HashSet<String>,
                     claimed_ids: &mut HashSet<String>| {
        claimed_stories.insert(h.story_id.clone());
        claimed_ids.insert(h.headline_id.clone());
        slots.push(h.clone());
    };

    // Slot 0: explicit slug wins.
    if let Some(slug) = slug {
        if let Some(pinned) = sorted.iter().find(|h| h.headline_id == slug) {
            claim(pinned, &mut slots, &mut claimed_stories, &mut claimed_ids);
        }
    }

    // Slot 0 fallback: best headline the reader has not seen.
    if slots.is_empty() && query.is_none() {
        if let Some(best) = sorted
            .iter()
            .find(|h| !seen.contains(&h.headline_id) && !claimed_stories.contains(&h.story_id))
        {
            claim(best, &mut slots, &mut claimed_stories, &mut claimed_ids);
        }
    }

    // Search matches come next, shuffled, one story each.
    if let Some(query) = query {
        let needle = query.to_lowercase();
        let mut matches: Vec<&Headline> = sorted
            .iter()
            .filter(|h| {
                h.headline.to_lowercase().contains(&needle)
                    || h.original_headline.to_lowercase().contains(&needle)
            })
            .collect();
        matches.shuffle(rng);

        for candidate in matches {
            if slots.len() >= FRONT_PAGE_SLOTS {
                break;
            }
            if claimed_ids.contains(&candidate.headline_id)
                || claimed_stories.contains(&candidate.story_id)
            {
                continue;
            }
            claim(candidate, &mut slots, &mut claimed_stories, &mut claimed_ids);
        }
    }

    // Expanding pools: one random pick per pool from a widening prefix.
    for pool_size in EXPANDING_POOLS {
        if slots.len() >= FRONT_PAGE_SLOTS {
            break;
        }
        let prefix = &sorted[..pool_size.min(sorted.len())];
        let candidates: Vec<&Headline> = prefix
            .iter()
            .filter(|h| {
                !claimed_ids.contains(&h.headline_id)
                    && !claimed_stories.contains(&h.story_id)
            })
            .collect();
        if let Some(pick) = candidates.choose(rng) {
            claim(pick, &mut slots, &mut claimed_stories, &mut claimed_ids);
        }
    }

    // Still short: fill in rank order from any unclaimed story.
    for candidate in sorted {
        if slots.len() >= FRONT_PAGE_SLOTS {
            break;
        }
        if claimed_ids.contains(&candidate.headline_id)
            || claimed_stories.contains(&candidate.story_id)
        {
            continue;
        }
        claim(candidate, &mut slots, &mut claimed_stories, &mut claimed_ids);
    }

    slots.truncate(FRONT_PAGE_SLOTS);
    slots
}

/// Refusal boilerplate that occasionally survives generation; never serve it.
pub fn is_ai_apology(text: &str) -> bool {
    const PHRASES: [&str; 7] = [
        "an AI language model",
        "I cannot perform this task",
        "I cannot do this task",
        "inappropriate content",
        "offensive content",
        "content policy",
        "I cannot fulfill this request",
    ];
    PHRASES.iter().any(|phrase| text.contains(phrase))
}
