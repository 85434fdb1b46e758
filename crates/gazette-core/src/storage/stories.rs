//! CRUD operations for fetched stories.

use super::events::append_story_event;
use super::DbPool;
use crate::error::StorageError;
use crate::model::{EventKind, Story};

/// Insert a story if no story with the same `(day, title)` exists.
///
/// Returns `true` when the row was written, `false` on a conflict — the
/// ingestor treats a conflict as a silent skip, not an error. A change
/// event is appended in the same transaction as the insert.
pub async fn insert_story(pool: &DbPool, story: &Story) -> Result<bool, StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    let result = sqlx::query(
        "INSERT OR IGNORE INTO stories \
         (year_month_day, story_id, title, description, published_at, image_url, url, \
          source, fetch_category, keywords, language, country, retrieved_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(&story.year_month_day)
    .bind(&story.story_id)
    .bind(&story.title)
    .bind(&story.description)
    .bind(&story.published_at)
    .bind(&story.image_url)
    .bind(&story.url)
    .bind(&story.source)
    .bind(&story.fetch_category)
    .bind(&story.keywords)
    .bind(&story.language)
    .bind(&story.country)
    .bind(&story.retrieved_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    if result.rows_affected() == 0 {
        tx.rollback()
            .await
            .map_err(|e| StorageError::Query { source: e })?;
        return Ok(false);
    }

    append_story_event(&mut tx, EventKind::Insert, &story.year_month_day, &story.story_id)
        .await?;

    tx.commit()
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(true)
}

/// Fetch a single story by its composite key. Returns `None` if not found.
pub async fn get_story(
    pool: &DbPool,
    year_month_day: &str,
    story_id: &str,
) -> Result<Option<Story>, StorageError> {
    sqlx::query_as::<_, Story>(
        "SELECT * FROM stories WHERE year_month_day = ?1 AND story_id = ?2",
    )
    .bind(year_month_day)
    .bind(story_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// All stories for a day, in insertion order.
pub async fn stories_for_day(
    pool: &DbPool,
    year_month_day: &str,
) -> Result<Vec<Story>, StorageError> {
    sqlx::query_as::<_, Story>(
        "SELECT * FROM stories WHERE year_month_day = ?1 ORDER BY retrieved_at, story_id",
    )
    .bind(year_month_day)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}
