//! Prompt construction for the two generation stages.
//!
//! The system prompts are static so providers with ephemeral prompt
//! caching can reuse them across every call in a warm process. Anything
//! story-specific goes in the user prompt.

use super::AngleSpec;
use crate::model::Story;

/// Stage-1 system prompt: judging criteria, example angles, response format.
pub const BRAINSTORM_SYSTEM: &str = "\
You are the head writer at a satirical newspaper in the tradition of The Onion \
and the New York Post's punnier moods. Given a real news headline, you invent \
comedic angles a staff writer could draft from.

What makes an angle good:
- Clever alliteration, assonance, or a pun that works phonetically
- An unexpected reframe of who the story is really about
- Absurdist escalation that keeps one foot in the original facts
- Rhythm: the headline should land when read aloud

Example angles for \"City Council Approves New Bridge\":
- wordplay: lean on 'bridge' double meanings (dental, card game, burning)
- bureaucratic-absurdism: the bridge must now attend council meetings
- local-hero: the river files a complaint about being crossed

Respond with ONLY a JSON array of at most 5 objects, each:
{\"angle_name\": \"short-slug\", \"setup\": \"one sentence a writer can run with\", \
\"keywords\": [\"words\", \"to\", \"play\", \"on\"]}";

/// Stage-2 system prompt: drafting rules and response format.
pub const GENERATE_SYSTEM: &str = "\
You are a copywriter who writes short headlines in a pithy, succinct, funny, \
satirical style like the New York Post. You receive a real headline and one \
comedic angle, and you draft finished satirical headlines for it.

Rules:
- Each headline stands alone: no setup text, no explanations
- Keep them under 15 words; shorter usually lands harder
- Stay on the given angle; don't drift into generic jokes
- Never open with 'Breaking' or end with an exclamation point

Respond with ONLY a JSON array of 3 to 4 headline strings.";

/// Build the stage-1 user prompt.
pub fn brainstorm_prompt(story: &Story, inspiration: &[String]) -> String {
    format!(
        "HEADLINE: \"{}\"\nSUBTITLE: \"{}\"\n\nRandom inspiration words \
         (use any that spark something, ignore the rest): {}\n\nInvent the angles.",
        story.title,
        story.description,
        inspiration.join(", "),
    )
}

/// Build the stage-2 user prompt for one angle.
pub fn generate_prompt(story: &Story, angle: &AngleSpec) -> String {
    let keywords = if angle.keywords.is_empty() {
        String::new()
    } else {
        format!("\nKeywords to play on: {}", angle.keywords.join(", "))
    };
    format!(
        "HEADLINE: \"{}\"\nSUBTITLE: \"{}\"\n\nAngle: {}\nSetup: {}{}\n\nDraft the headlines.",
        story.title, story.description, angle.angle_name, angle.setup, keywords,
    )
}

/// The hard-coded angles used when stage 1 returns nothing usable.
pub fn fallback_angles() -> Vec<AngleSpec> {
    vec![
        AngleSpec {
            angle_name: "wordplay".to_string(),
            setup: "Puns and double meanings on the key words of the headline".to_string(),
            keywords: Vec::new(),
        },
        AngleSpec {
            angle_name: "rhyme".to_string(),
            setup: "Rewrite the headline so it rhymes or has strong assonance".to_string(),
            keywords: Vec::new(),
        },
        AngleSpec {
            angle_name: "absurdist".to_string(),
            setup: "Escalate the story one step past plausible".to_string(),
            keywords: Vec::new(),
        },
    ]
}
