//! Product catalog: public browsing plus admin CRUD.

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
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub currency: String,
    pub category_id: Option<Uuid>,
    pub stock_quantity: i32,
    pub status: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub rating_avg: Decimal,
    pub rating_count: i32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>, AppError> {
    let (limit, offset, page) = p.paging();
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' \
         AND ($1::uuid IS NULL OR category_id = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(p.category)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE status = 'active' \
         AND ($1::uuid IS NULL OR category_id = $1)",
    )
    .bind(p.category)
    .fetch_one(&s.db)
    .await?;
    Ok(Json(PaginatedResponse { data: products, total: total.0, page }))
}

pub async fn search(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Vec<Product>>, AppError> {
    let q = p.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(AppError::Validation("query parameter 'q' is required".into()));
    }
    let pattern = format!("%{}%", q.trim());
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' \
         AND (name ILIKE $1 OR description ILIKE $1 OR $2 = ANY(tags)) \
         ORDER BY rating_avg DESC, created_at DESC LIMIT 50",
    )
    .bind(&pattern)
    .bind(q.trim())
    .fetch_all(&s.db)
    .await?;
    Ok(Json(products))
}

pub async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND status <> 'deleted'")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UpsertProductRequest {
    fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.price < Decimal::ZERO {
            return Err(AppError::Validation("price must not be negative".into()));
        }
        if self.stock_quantity.unwrap_or(0) < 0 {
            return Err(AppError::Validation("stock_quantity must not be negative".into()));
        }
        Ok(())
    }
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<UpsertProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    r.check()?;
    let sku = format!("SKU-{:08}", rand::random::<u32>() % 100_000_000);
    let p = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, sku, name, description, price, original_price, category_id, \
         stock_quantity, images, tags) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&sku)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.original_price)
    .bind(r.category_id)
    .bind(r.stock_quantity.unwrap_or(0))
    .bind(&r.images)
    .bind(&r.tags)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(product_id = %p.id, sku = %p.sku, "product created");
    Ok((StatusCode::CREATED, Json(p)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpsertProductRequest>,
) -> Result<Json<Product>, AppError> {
    r.check()?;
    // An omitted stock_quantity leaves stock alone; concurrent checkout
    // decrements go through adjust_stock-style guarded updates, not here.
    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, original_price = $5, \
         category_id = $6, stock_quantity = COALESCE($7, stock_quantity), images = $8, \
         tags = $9, updated_at = NOW() \
         WHERE id = $1 AND status <> 'deleted' RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.original_price)
    .bind(r.category_id)
    .bind(r.stock_quantity)
    .bind(&r.images)
    .bind(&r.tags)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("product"))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // Soft delete keeps the row for order-item history.
    let result = sqlx::query("UPDATE products SET status = 'deleted', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

/// Admin stock adjustment, guarded so stock never goes negative.
pub async fn adjust_stock(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<AdjustStockRequest>,
) -> Result<Json<Product>, AppError> {
    let updated = sqlx::query_as::<_, Product>(
        "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW() \
         WHERE id = $1 AND stock_quantity + $2 >= 0 RETURNING *",
    )
    .bind(id)
    .bind(r.delta)
    .fetch_optional(&s.db)
    .await?;
    match updated {
        Some(p) => Ok(Json(p)),
        None => {
            // Distinguish missing product from an underflowing adjustment.
            let exists: (bool,) =
                sqlx::query_as("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&s.db)
                    .await?;
            if exists.0 {
                Err(AppError::InsufficientStock(id))
            } else {
                Err(AppError::NotFound("product"))
            }
        }
    }
}
