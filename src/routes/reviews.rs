//! Product reviews. Creation updates the product's denormalized rating
//! aggregates in the same transaction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn list(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(product_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(reviews))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub user_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub title: Option<String>,
    pub body: Option<String>,
}

pub async fn create(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(r): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    r.validate()?;

    let mut tx = s.db.begin().await?;
    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, product_id, user_id, rating, title, body) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(r.user_id)
    .bind(r.rating)
    .bind(&r.title)
    .bind(&r.body)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("user has already reviewed this product".into())
        }
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            AppError::NotFound("product or user")
        }
        other => AppError::Database(other),
    })?;

    sqlx::query(
        "UPDATE products p SET \
         rating_avg = agg.avg_rating, rating_count = agg.review_count, updated_at = NOW() \
         FROM (SELECT AVG(rating)::numeric(3,2) AS avg_rating, COUNT(*) AS review_count \
               FROM reviews WHERE product_id = $1) agg \
         WHERE p.id = $1",
    )
    .bind(product_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(review)))
}
