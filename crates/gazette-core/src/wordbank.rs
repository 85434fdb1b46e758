//! The word bank: random inspiration words for generation and paper naming.
//!
//! Read-mostly. The full table is loaded once per process on first use and
//! held behind an `RwLock`; there is no invalidation — restart to pick up
//! new words.

use crate::error::StorageError;
use crate::storage::{words, DbPool};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-wide word cache keyed by word type.
pub struct WordBank {
    pool: DbPool,
    cache: RwLock<Option<HashMap<String, Vec<String>>>>,
}

impl WordBank {
    /// Create an unloaded bank over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            cache: RwLock::new(None),
        }
    }

    /// Force the cache to load now. Otherwise it loads on first read.
    pub async fn load(&self) -> Result<(), StorageError> {
        self.ensure_loaded().await
    }

    async fn ensure_loaded(&self) -> Result<(), StorageError> {
        if self.cache.read().await.is_some() {
            return Ok(());
        }
        let mut guard = self.cache.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut by_type: HashMap<String, Vec<String>> = HashMap::new();
        for (word_type, word) in words::all_words(&self.pool).await? {
            by_type.entry(word_type).or_default().push(word);
        }
        tracing::debug!(word_types = by_type.len(), "word bank loaded");
        *guard = Some(by_type);
        Ok(())
    }

    /// A random word of the given type, or `None` when the type is empty.
    pub async fn random_word(&self, word_type: &str) -> Result<Option<String>, StorageError> {
        self.ensure_loaded().await?;
        let guard = self.cache.read().await;
        let by_type = guard.as_ref().expect("cache loaded");
        Ok(by_type
            .get(word_type)
            .and_then(|words| words.choose(&mut rand::thread_rng()))
            .cloned())
    }

    /// Up to `n` distinct random words drawn across every type.
    pub async fn random_words(&self, n: usize) -> Result<Vec<String>, StorageError> {
        self.ensure_loaded().await?;
        let guard = self.cache.read().await;
        let by_type = guard.as_ref().expect("cache loaded");
        let all: Vec<&String> = by_type.values().flatten().collect();
        Ok(all
            .choose_multiple(&mut rand::thread_rng(), n.min(all.len()))
            .map(|w| (*w).clone())
            .collect())
    }

    /// Compose the masthead: `"The <Adjective> <NewspaperName>"`.
    pub async fn paper_name(&self) -> Result<String, StorageError> {
        let adjective = self
            .random_word("adjective")
            .await?
            .unwrap_or_else(|| "daily".to_string());
        let paper = self
            .random_word("newspaper-name")
            .await?
            .unwrap_or_else(|| "gazette".to_string());
        Ok(format!("The {} {}", capitalize(&adjective), capitalize(&paper)))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    async fn seeded_bank() -> WordBank {
        let pool = init_test_db().await.expect("init db");
        words::insert_word(&pool, "adjective", "unhinged").await.unwrap();
        words::insert_word(&pool, "newspaper-name", "bugle").await.unwrap();
        words::insert_word(&pool, "noun", "walrus").await.unwrap();
        words::insert_word(&pool, "noun", "zamboni").await.unwrap();
        WordBank::new(pool)
    }

    #[tokio::test]
    async fn random_word_draws_from_requested_type() {
        let bank = seeded_bank().await;
        let word = bank.random_word("adjective").await.unwrap();
        assert_eq!(word.as_deref(), Some("unhinged"));
        assert_eq!(bank.random_word("verb").await.unwrap(), None);
    }

    #[tokio::test]
    async fn random_words_caps_at_bank_size() {
        let bank = seeded_bank().await;
        let words = bank.random_words(50).await.unwrap();
        assert_eq!(words.len(), 4);
    }

    #[tokio::test]
    async fn paper_name_is_capitalized() {
        let bank = seeded_bank().await;
        assert_eq!(bank.paper_name().await.unwrap(), "The Unhinged Bugle");
    }

    #[tokio::test]
    async fn paper_name_falls_back_when_bank_is_empty() {
        let pool = init_test_db().await.expect("init db");
        let bank = WordBank::new(pool);
        assert_eq!(bank.paper_name().await.unwrap(), "The Daily Gazette");
    }

    #[tokio::test]
    async fn cache_ignores_words_added_after_load() {
        let pool = init_test_db().await.expect("init db");
        words::insert_word(&pool, "adjective", "first").await.unwrap();
        let bank = WordBank::new(pool.clone());
        bank.load().await.unwrap();

        words::insert_word(&pool, "adjective", "second").await.unwrap();
        for _ in 0..20 {
            assert_eq!(bank.random_word("adjective").await.unwrap().as_deref(), Some("first"));
        }
    }
}
