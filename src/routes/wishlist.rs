//! Per-user wishlists.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub in_stock: bool,
    pub added_at: DateTime<Utc>,
}

pub async fn list(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<WishlistEntry>>, AppError> {
    let entries = sqlx::query_as::<_, WishlistEntry>(
        "SELECT w.id, w.product_id, p.name, p.price, (p.images)[1] AS image, \
                p.stock_quantity > 0 AS in_stock, w.created_at AS added_at \
         FROM wishlist_items w JOIN products p ON p.id = w.product_id \
         WHERE w.user_id = $1 AND p.status = 'active' \
         ORDER BY w.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct AddWishlistRequest {
    pub product_id: Uuid,
}

pub async fn add(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(r): Json<AddWishlistRequest>,
) -> Result<StatusCode, AppError> {
    sqlx::query(
        "INSERT INTO wishlist_items (id, user_id, product_id) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, product_id) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(r.product_id)
    .execute(&s.db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            AppError::NotFound("product")
        }
        other => AppError::Database(other),
    })?;
    Ok(StatusCode::CREATED)
}

pub async fn remove(
    State(s): State<AppState>,
    Path((user_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let result =
        sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&s.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("wishlist item"));
    }
    Ok(StatusCode::NO_CONTENT)
}
