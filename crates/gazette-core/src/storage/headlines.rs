//! CRUD operations for satirical headlines.
//!
//! Headlines are written once by the subvert worker and mutated only by
//! the tournament engine (rank fields and the polish rewrite). Rows are
//! never deleted; demotion removes the rank, not the row.

use super::events::append_headline_event;
use super::DbPool;
use crate::error::StorageError;
use crate::model::{EventKind, Headline};

/// Insert a freshly generated headline and its change event.
pub async fn insert_headline(pool: &DbPool, headline: &Headline) -> Result<(), StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query(
        "INSERT INTO headlines \
         (year_month_day, headline_id, headline, original_headline, original_subverted, \
          angle, angle_setup, story_id, create_time, rank, cross_day_rank, \
          tournament_batch, survived) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(&headline.year_month_day)
    .bind(&headline.headline_id)
    .bind(&headline.headline)
    .bind(&headline.original_headline)
    .bind(&headline.original_subverted)
    .bind(&headline.angle)
    .bind(&headline.angle_setup)
    .bind(&headline.story_id)
    .bind(&headline.create_time)
    .bind(headline.rank)
    .bind(headline.cross_day_rank)
    .bind(headline.tournament_batch)
    .bind(headline.survived)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    append_headline_event(
        &mut tx,
        EventKind::Insert,
        &headline.year_month_day,
        &headline.headline_id,
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Fetch a single headline by its composite key. Returns `None` if not found.
pub async fn get_headline(
    pool: &DbPool,
    year_month_day: &str,
    headline_id: &str,
) -> Result<Option<Headline>, StorageError> {
    sqlx::query_as::<_, Headline>(
        "SELECT * FROM headlines WHERE year_month_day = ?1 AND headline_id = ?2",
    )
    .bind(year_month_day)
    .bind(headline_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// All headlines for a day.
pub async fn headlines_for_day(
    pool: &DbPool,
    year_month_day: &str,
) -> Result<Vec<Headline>, StorageError> {
    sqlx::query_as::<_, Headline>(
        "SELECT * FROM headlines WHERE year_month_day = ?1 ORDER BY create_time, headline_id",
    )
    .bind(year_month_day)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// All headlines of one story on a day.
pub async fn headlines_for_story(
    pool: &DbPool,
    year_month_day: &str,
    story_id: &str,
) -> Result<Vec<Headline>, StorageError> {
    sqlx::query_as::<_, Headline>(
        "SELECT * FROM headlines WHERE year_month_day = ?1 AND story_id = ?2 \
         ORDER BY create_time, headline_id",
    )
    .bind(year_month_day)
    .bind(story_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// Whether any headline exists for this story on this day.
///
/// This is the subvert worker's idempotency guard against at-least-once
/// event delivery.
pub async fn story_has_headlines(
    pool: &DbPool,
    year_month_day: &str,
    story_id: &str,
) -> Result<bool, StorageError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM headlines WHERE year_month_day = ?1 AND story_id = ?2)",
    )
    .bind(year_month_day)
    .bind(story_id)
    .fetch_one(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.0 == 1)
}

/// The top-ranked headlines of a day, best first.
pub async fn top_ranked_for_day(
    pool: &DbPool,
    year_month_day: &str,
    limit: u32,
) -> Result<Vec<Headline>, StorageError> {
    sqlx::query_as::<_, Headline>(
        "SELECT * FROM headlines WHERE year_month_day = ?1 AND rank IS NOT NULL \
         ORDER BY rank ASC LIMIT ?2",
    )
    .bind(year_month_day)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// Promote a headline into the survivor cohort with its assigned rank.
pub async fn mark_survivor(
    pool: &DbPool,
    year_month_day: &str,
    headline_id: &str,
    rank: i64,
    batch: i64,
) -> Result<(), StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query(
        "UPDATE headlines SET rank = ?3, tournament_batch = ?4, survived = 1 \
         WHERE year_month_day = ?1 AND headline_id = ?2",
    )
    .bind(year_month_day)
    .bind(headline_id)
    .bind(rank)
    .bind(batch)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    append_headline_event(&mut tx, EventKind::Modify, year_month_day, headline_id).await?;
    tx.commit()
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Demote a headline out of the cohort: rank removed, batch marker kept.
pub async fn mark_eliminated(
    pool: &DbPool,
    year_month_day: &str,
    headline_id: &str,
    batch: i64,
) -> Result<(), StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query(
        "UPDATE headlines SET rank = NULL, tournament_batch = ?3, survived = 0 \
         WHERE year_month_day = ?1 AND headline_id = ?2",
    )
    .bind(year_month_day)
    .bind(headline_id)
    .bind(batch)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    append_headline_event(&mut tx, EventKind::Modify, year_month_day, headline_id).await?;
    tx.commit()
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Write a cross-day rank. Daily rank and batch are untouched.
pub async fn set_cross_day_rank(
    pool: &DbPool,
    year_month_day: &str,
    headline_id: &str,
    cross_day_rank: i64,
) -> Result<(), StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query(
        "UPDATE headlines SET cross_day_rank = ?3 \
         WHERE year_month_day = ?1 AND headline_id = ?2",
    )
    .bind(year_month_day)
    .bind(headline_id)
    .bind(cross_day_rank)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    append_headline_event(&mut tx, EventKind::Modify, year_month_day, headline_id).await?;
    tx.commit()
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Apply a polish rewrite, preserving the prior text.
///
/// The `original_subverted IS NULL` guard makes the pass idempotent: a
/// second final run matches zero rows. Returns whether the rewrite landed.
pub async fn apply_polish(
    pool: &DbPool,
    year_month_day: &str,
    headline_id: &str,
    improved: &str,
) -> Result<bool, StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    let result = sqlx::query(
        "UPDATE headlines SET original_subverted = headline, headline = ?3 \
         WHERE year_month_day = ?1 AND headline_id = ?2 AND original_subverted IS NULL",
    )
    .bind(year_month_day)
    .bind(headline_id)
    .bind(improved)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    if result.rows_affected() == 0 {
        tx.rollback()
            .await
            .map_err(|e| StorageError::Query { source: e })?;
        return Ok(false);
    }

    append_headline_event(&mut tx, EventKind::Modify, year_month_day, headline_id).await?;
    tx.commit()
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(true)
}
