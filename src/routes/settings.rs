//! Key/JSONB settings store.
//!
//! Updates are field-level merges (`value || patch`), never wholesale
//! overwrites, so concurrent admin edits to different fields both land.

use axum::extract::{Path, State};
use axum::Json;
use sqlx::PgPool;

use crate::error::AppError;
use crate::state::AppState;

const KNOWN_KEYS: &[&str] = &["general", "email", "payment", "shipping"];

/// Plain fetch used by other modules (payment bootstrap, email templates).
pub async fn fetch(db: &PgPool, key: &str) -> Result<Option<serde_json::Value>, sqlx::Error> {
    let row: Option<(serde_json::Value,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(v,)| v))
}

pub async fn get_key(
    State(s): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_key(&key)?;
    let value = fetch(&s.db, &key).await?.unwrap_or_else(|| serde_json::json!({}));
    Ok(Json(value))
}

pub async fn update_key(
    State(s): State<AppState>,
    Path(key): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_key(&key)?;
    if !patch.is_object() {
        return Err(AppError::Validation("settings patch must be a JSON object".into()));
    }
    let (value,): (serde_json::Value,) = sqlx::query_as(
        "INSERT INTO settings (key, value) VALUES ($1, $2) \
         ON CONFLICT (key) DO UPDATE SET value = settings.value || EXCLUDED.value, \
         updated_at = NOW() \
         RETURNING value",
    )
    .bind(&key)
    .bind(&patch)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(key, "settings updated");
    Ok(Json(value))
}

fn check_key(key: &str) -> Result<(), AppError> {
    if KNOWN_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(AppError::NotFound("settings key"))
    }
}
