//! Judge prompt construction for group ranking and the polish pass.

use crate::model::Headline;

use super::ranking::label_for;

/// Build the group-ranking prompt. Entrants are labelled A.. in
/// insertion order; the judge answers with one comma-separated line.
pub fn group_prompt(group: &[Headline], verbose: bool) -> String {
    let mut prompt = String::from(
        "Rank these satirical headlines from best to worst. Consider the original \
         news and the comedic approach.\n\n",
    );

    for (i, entrant) in group.iter().enumerate() {
        let label = label_for(i);
        prompt.push_str(&format!(
            "{label}. \"{}\"\n   Original: \"{}\"\n   Comedic angle: {}\n   Approach: {}\n\n",
            entrant.headline, entrant.original_headline, entrant.angle, entrant.angle_setup,
        ));
    }

    prompt.push_str(
        "Value CRAFT as much as humor:\n\
         - Clever alliteration or assonance\n\
         - Puns that actually work phonetically\n\
         - Unexpected wordplay or double meanings\n\
         - Rhythm and flow when read aloud\n\
         - How well the joke plays off the original headline\n\n\
         A straightforward joke that lands is good, but a headline with clever \
         linguistic craft is equally valuable.\n\n",
    );

    let last = label_for(group.len() - 1);
    if verbose {
        prompt.push_str(&format!(
            "Reply with one line of comma-separated letters (A through {last}) from best \
             to worst. After that line you may add a short explanation of the top pick.",
        ));
    } else {
        prompt.push_str(&format!(
            "Reply with ONLY one line of comma-separated letters (A through {last}) from \
             best to worst, nothing else.",
        ));
    }

    prompt
}

/// Build the polish prompt for one finalist.
pub fn polish_prompt(headline: &Headline) -> String {
    format!(
        "This satirical headline made the day's finals. Punch it up: tighten the \
         wording, sharpen the wordplay, keep the joke.\n\n\
         HEADLINE: \"{}\"\n\
         Original news: \"{}\"\n\
         Comedic angle: {}\n\n\
         Reply with ONLY the improved headline. If it cannot be improved, reply \
         with the headline unchanged.",
        headline.headline, headline.original_headline, headline.angle,
    )
}
