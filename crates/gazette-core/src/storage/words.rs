//! CRUD operations for the word bank.

use super::DbPool;
use crate::error::StorageError;

/// Insert a word. Duplicate `(word_type, word)` pairs are ignored.
pub async fn insert_word(pool: &DbPool, word_type: &str, word: &str) -> Result<(), StorageError> {
    sqlx::query("INSERT OR IGNORE INTO words (word_type, word) VALUES (?1, ?2)")
        .bind(word_type)
        .bind(word)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// All `(word_type, word)` pairs, for the process-wide cache.
pub async fn all_words(pool: &DbPool) -> Result<Vec<(String, String)>, StorageError> {
    sqlx::query_as("SELECT word_type, word FROM words ORDER BY word_type, word")
        .fetch_all(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}
