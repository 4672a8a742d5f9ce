//! User accounts, admin management, and first-admin setup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, PaginatedResponse};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub account_type: String,
    pub status: String,
    pub email_verified: bool,
    pub tier: String,
    pub total_spent: Decimal,
    pub order_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_STATUSES: &[&str] = &["active", "locked", "suspended"];

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

pub async fn register(
    State(s): State<AppState>,
    Json(r): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    r.validate()?;
    let u = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.email.trim().to_lowercase())
    .bind(r.name.trim())
    .fetch_one(&s.db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("email already registered".into())
        }
        other => AppError::Database(other),
    })?;
    tracing::info!(user_id = %u.id, "user registered");
    Ok((StatusCode::CREATED, Json(u)))
}

pub async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("user"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

pub async fn update_profile(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    r.validate()?;
    sqlx::query_as::<_, User>(
        "UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(r.name.trim())
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("user"))
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<User>>, AppError> {
    let (limit, offset, page) = p.paging();
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&p.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR status = $1)")
            .bind(&p.status)
            .fetch_one(&s.db)
            .await?;
    Ok(Json(PaginatedResponse { data: users, total: total.0, page }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<User>, AppError> {
    if !USER_STATUSES.contains(&r.status.as_str()) {
        return Err(AppError::Validation(format!("unknown status '{}'", r.status)));
    }
    sqlx::query_as::<_, User>(
        "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.status)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("user"))
}

/// One-time first-admin creation. The conditional insert is atomic, so
/// two concurrent setup calls cannot both create an admin.
pub async fn setup_admin(
    State(s): State<AppState>,
    Json(r): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    r.validate()?;
    let admin = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, name, account_type, email_verified) \
         SELECT $1, $2, $3, 'admin', TRUE \
         WHERE NOT EXISTS (SELECT 1 FROM users WHERE account_type = 'admin') \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.email.trim().to_lowercase())
    .bind(r.name.trim())
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| AppError::Conflict("an admin account already exists".into()))?;
    tracing::info!(user_id = %admin.id, "admin account created");
    Ok((StatusCode::CREATED, Json(admin)))
}
