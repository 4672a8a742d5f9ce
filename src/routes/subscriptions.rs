//! Newsletter subscriptions. Subscribe is an idempotent upsert.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(email)]
    pub email: String,
}

pub async fn subscribe(
    State(s): State<AppState>,
    Json(r): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    r.validate()?;
    sqlx::query(
        "INSERT INTO subscriptions (id, email, active) VALUES ($1, $2, TRUE) \
         ON CONFLICT (email) DO UPDATE SET active = TRUE, updated_at = NOW()",
    )
    .bind(Uuid::now_v7())
    .bind(r.email.trim().to_lowercase())
    .execute(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

pub async fn unsubscribe(
    State(s): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query(
        "UPDATE subscriptions SET active = FALSE, updated_at = NOW() WHERE email = $1",
    )
    .bind(email.trim().to_lowercase())
    .execute(&s.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("subscription"));
    }
    Ok(Json(json!({ "success": true })))
}
