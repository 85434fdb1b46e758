//! Shared data model: stories, headlines, day keys, and change events.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The editorial timezone. Day keys and the final-run hour check are
/// evaluated in this zone regardless of where the process runs.
pub const EDITORIAL_TZ: Tz = chrono_tz::America::New_York;

/// Alphabet for record ids: lowercase base36, matching the 5-char ids
/// stories and headlines carry in their sort keys.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of story and headline ids.
const ID_LEN: usize = 5;

/// Generate a fresh 5-char base36 record id.
pub fn new_record_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Today's day key (`YYYYMMDD`) in the editorial timezone.
pub fn editorial_today() -> String {
    Utc::now().with_timezone(&EDITORIAL_TZ).format("%Y%m%d").to_string()
}

/// The current hour (0-23) in the editorial timezone.
pub fn editorial_hour() -> u32 {
    use chrono::Timelike;
    Utc::now().with_timezone(&EDITORIAL_TZ).hour()
}

/// Day key for a published-at timestamp, in the publisher's own offset.
pub fn day_key_from_published(published_at: &DateTime<FixedOffset>) -> String {
    published_at.format("%Y%m%d").to_string()
}

/// The day key `days_back` days before `day`. Returns `None` when `day`
/// does not parse as `YYYYMMDD`.
pub fn day_before(day: &str, days_back: i64) -> Option<String> {
    let date = NaiveDate::parse_from_str(day, "%Y%m%d").ok()?;
    Some((date - Duration::days(days_back)).format("%Y%m%d").to_string())
}

/// Whether a string is a well-formed day key.
pub fn is_day_key(s: &str) -> bool {
    s.len() == 8 && NaiveDate::parse_from_str(s, "%Y%m%d").is_ok()
}

/// A fetched news story. Immutable once written.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Story {
    /// Partition key, `YYYYMMDD` derived from the publish date.
    pub year_month_day: String,
    /// Sort key, 5-char base36.
    pub story_id: String,
    /// Original headline text.
    pub title: String,
    /// Original subtitle / description.
    pub description: String,
    /// ISO-8601 publish timestamp as supplied by the feed.
    pub published_at: String,
    /// Required: stories without an image are rejected at ingest.
    pub image_url: String,
    /// Link to the original article.
    pub url: String,
    /// Feed source id.
    pub source: Option<String>,
    /// How this story was fetched (a category, or `manual:<query>`).
    pub fetch_category: Option<String>,
    /// Provider keywords, JSON-encoded list.
    pub keywords: Option<String>,
    /// Provider language code.
    pub language: Option<String>,
    /// Provider country code.
    pub country: Option<String>,
    /// When the ingestor wrote this row.
    pub retrieved_at: String,
}

/// A satirical variant of a story. Rank fields are owned by the tournament
/// engine; everything else is immutable after the subvert worker writes it.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Headline {
    /// Partition key, shared with the owning story.
    pub year_month_day: String,
    /// Sort key, 5-char base36, unique within the day.
    pub headline_id: String,
    /// Current headline text. May be rewritten once by the polish pass.
    pub headline: String,
    /// The real headline this variant subverts.
    pub original_headline: String,
    /// The pre-polish text. Presence means a polish pass ran.
    pub original_subverted: Option<String>,
    /// The comedic angle chosen in stage 1.
    pub angle: String,
    /// The angle's setup notes, carried into judge prompts.
    pub angle_setup: String,
    /// The owning story's sort key.
    pub story_id: String,
    /// ISO-8601 creation timestamp.
    pub create_time: String,
    /// Daily tournament rank. `None` when unranked or demoted.
    pub rank: Option<i64>,
    /// Rank within the rolling 3-day pool, when assigned.
    pub cross_day_rank: Option<i64>,
    /// Index of the last tournament run that evaluated this headline.
    pub tournament_batch: Option<i64>,
    /// Whether the headline is in the live survivor cohort.
    pub survived: Option<bool>,
}

impl Headline {
    /// Whether a polish pass has already rewritten this headline.
    pub fn is_polished(&self) -> bool {
        self.original_subverted.is_some()
    }
}

/// Kind of change recorded on an event outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A new row was written.
    Insert,
    /// An existing row was updated.
    Modify,
    /// A row was removed.
    Remove,
}

impl EventKind {
    /// Stable string form stored in the outbox tables.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Insert => "INSERT",
            EventKind::Modify => "MODIFY",
            EventKind::Remove => "REMOVE",
        }
    }

    /// Parse the stored string form. Unknown strings map to `Modify` so a
    /// consumer never drops an event on the floor.
    pub fn parse(s: &str) -> Self {
        match s {
            "INSERT" => EventKind::Insert,
            "REMOVE" => EventKind::Remove,
            _ => EventKind::Modify,
        }
    }
}

/// A drained change event pointing at the current image of a row.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Outbox sequence number; consumers advance their cursor past it.
    pub seq: i64,
    /// What happened.
    pub event: EventKind,
    /// Partition key of the affected row.
    pub year_month_day: String,
    /// Sort key of the affected row (story or headline id).
    pub record_id: String,
}
