//! Change-event outboxes and per-consumer cursors.
//!
//! Writers append an event row inside the same transaction as the data
//! write; consumers drain events past their cursor and advance it after
//! processing. A crash between drain and advance redelivers the batch,
//! so every consumer must be idempotent.

use super::DbPool;
use crate::error::StorageError;
use crate::model::{ChangeEvent, EventKind};
use sqlx::SqliteConnection;

/// Append a story change event. Called inside the story write transaction.
pub(crate) async fn append_story_event(
    conn: &mut SqliteConnection,
    event: EventKind,
    year_month_day: &str,
    story_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO story_events (event, year_month_day, story_id) VALUES (?1, ?2, ?3)",
    )
    .bind(event.as_str())
    .bind(year_month_day)
    .bind(story_id)
    .execute(conn)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Append a headline change event. Called inside the headline write transaction.
pub(crate) async fn append_headline_event(
    conn: &mut SqliteConnection,
    event: EventKind,
    year_month_day: &str,
    headline_id: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO headline_events (event, year_month_day, headline_id) VALUES (?1, ?2, ?3)",
    )
    .bind(event.as_str())
    .bind(year_month_day)
    .bind(headline_id)
    .execute(conn)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Read a consumer's cursor position. Missing consumers start at 0.
pub async fn get_cursor(pool: &DbPool, consumer: &str) -> Result<i64, StorageError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT position FROM cursors WHERE consumer = ?1")
        .bind(consumer)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(row.map_or(0, |(p,)| p))
}

/// Advance a consumer's cursor, creating or updating the row atomically.
pub async fn set_cursor(pool: &DbPool, consumer: &str, position: i64) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO cursors (consumer, position, updated_at) VALUES (?1, ?2, datetime('now')) \
         ON CONFLICT(consumer) DO UPDATE SET position = excluded.position, \
         updated_at = datetime('now')",
    )
    .bind(consumer)
    .bind(position)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Drain up to `limit` story events past the consumer's cursor. Does not
/// advance the cursor; callers commit with [`set_cursor`] after processing.
pub async fn drain_story_events(
    pool: &DbPool,
    consumer: &str,
    limit: u32,
) -> Result<Vec<ChangeEvent>, StorageError> {
    let after = get_cursor(pool, consumer).await?;
    let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
        "SELECT seq, event, year_month_day, story_id FROM story_events \
         WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
    )
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(rows.into_iter().map(to_change_event).collect())
}

/// Drain up to `limit` headline events past the consumer's cursor.
pub async fn drain_headline_events(
    pool: &DbPool,
    consumer: &str,
    limit: u32,
) -> Result<Vec<ChangeEvent>, StorageError> {
    let after = get_cursor(pool, consumer).await?;
    let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
        "SELECT seq, event, year_month_day, headline_id FROM headline_events \
         WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2",
    )
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(rows.into_iter().map(to_change_event).collect())
}

fn to_change_event((seq, event, year_month_day, record_id): (i64, String, String, String)) -> ChangeEvent {
    ChangeEvent {
        seq,
        event: EventKind::parse(&event),
        year_month_day,
        record_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    #[tokio::test]
    async fn missing_cursor_starts_at_zero() {
        let pool = init_test_db().await.expect("init db");
        assert_eq!(get_cursor(&pool, "subvert").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn set_cursor_upserts() {
        let pool = init_test_db().await.expect("init db");
        set_cursor(&pool, "tournament", 5).await.unwrap();
        set_cursor(&pool, "tournament", 9).await.unwrap();
        assert_eq!(get_cursor(&pool, "tournament").await.unwrap(), 9);
    }

    #[tokio::test]
    async fn drain_respects_cursor_and_limit() {
        let pool = init_test_db().await.expect("init db");
        let mut conn = pool.acquire().await.unwrap();
        for i in 0..5 {
            append_story_event(&mut conn, EventKind::Insert, "20240101", &format!("id{i}"))
                .await
                .unwrap();
        }
        drop(conn);

        let first = drain_story_events(&pool, "subvert", 3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].record_id, "id0");

        // Until the cursor moves, the same events are redelivered.
        let again = drain_story_events(&pool, "subvert", 3).await.unwrap();
        assert_eq!(again.len(), 3);

        set_cursor(&pool, "subvert", first.last().unwrap().seq)
            .await
            .unwrap();
        let rest = drain_story_events(&pool, "subvert", 10).await.unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].record_id, "id3");
    }

    #[tokio::test]
    async fn consumers_have_independent_cursors() {
        let pool = init_test_db().await.expect("init db");
        let mut conn = pool.acquire().await.unwrap();
        append_headline_event(&mut conn, EventKind::Insert, "20240101", "h1")
            .await
            .unwrap();
        drop(conn);

        set_cursor(&pool, "a", 1).await.unwrap();
        assert_eq!(drain_headline_events(&pool, "a", 10).await.unwrap().len(), 0);
        assert_eq!(drain_headline_events(&pool, "b", 10).await.unwrap().len(), 1);
    }
}
