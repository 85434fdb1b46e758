//! Edition endpoints: the rolling today view and day/slug lookups.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use gazette_core::model::is_day_key;
use gazette_core::reader::Edition;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters shared by every edition endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct EditionQuery {
    /// Search term matched against served and original headlines.
    pub q: Option<String>,
    /// Comma-separated headline ids the reader has already seen.
    pub seen: Option<String>,
}

impl EditionQuery {
    fn seen_set(&self) -> HashSet<String> {
        self.seen
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `GET /today` — rolling three-day edition.
pub async fn today(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EditionQuery>,
) -> Result<Json<Edition>, ApiError> {
    let edition = state
        .reader
        .select(None, None, params.q.as_deref(), &params.seen_set())
        .await?;
    Ok(Json(edition))
}

/// `GET /{day}` — a specific day's edition.
pub async fn day(
    State(state): State<Arc<AppState>>,
    Path(day): Path<String>,
    Query(params): Query<EditionQuery>,
) -> Result<Json<Edition>, ApiError> {
    require_day_key(&day)?;
    let edition = state
        .reader
        .select(Some(&day), None, params.q.as_deref(), &params.seen_set())
        .await?;
    Ok(Json(edition))
}

/// `GET /{day}/{slug}` — a specific day with one headline pinned.
pub async fn day_with_slug(
    State(state): State<Arc<AppState>>,
    Path((day, slug)): Path<(String, String)>,
    Query(params): Query<EditionQuery>,
) -> Result<Json<Edition>, ApiError> {
    require_day_key(&day)?;
    let edition = state
        .reader
        .select(
            Some(&day),
            Some(&slug),
            params.q.as_deref(),
            &params.seen_set(),
        )
        .await?;
    Ok(Json(edition))
}

fn require_day_key(day: &str) -> Result<(), ApiError> {
    if is_day_key(day) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "'{day}' is not a YYYYMMDD day key"
        )))
    }
}
