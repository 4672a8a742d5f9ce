//! Contact messages: public submit, admin inbox.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, PaginatedResponse};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

pub async fn submit(
    State(s): State<AppState>,
    Json(r): Json<SubmitContactRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    r.validate()?;
    sqlx::query(
        "INSERT INTO contact_messages (id, name, email, subject, message) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::now_v7())
    .bind(r.name.trim())
    .bind(r.email.trim().to_lowercase())
    .bind(&r.subject)
    .bind(&r.message)
    .execute(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "success": true }))))
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<ContactMessage>>, AppError> {
    let (limit, offset, page) = p.paging();
    let unread_only = p.status.as_deref() == Some("unread");
    let messages = sqlx::query_as::<_, ContactMessage>(
        "SELECT * FROM contact_messages WHERE (NOT $1 OR NOT read) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(unread_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM contact_messages WHERE (NOT $1 OR NOT read)")
            .bind(unread_only)
            .fetch_one(&s.db)
            .await?;
    Ok(Json(PaginatedResponse { data: messages, total: total.0, page }))
}

pub async fn mark_read(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactMessage>, AppError> {
    sqlx::query_as::<_, ContactMessage>(
        "UPDATE contact_messages SET read = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("contact message"))
}
