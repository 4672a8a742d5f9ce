//! Order queries and admin lifecycle updates.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ListParams, PaginatedResponse};
use crate::domain::order::OrderStatus;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub customer_email: String,
    pub customer_name: String,
    pub status: String,
    pub payment_status: String,
    pub payment_ref: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub carrier_id: Option<Uuid>,
    pub estimated_delivery: Option<NaiveDate>,
    pub shipping_address: serde_json::Value,
    pub billing_address: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Order>>, AppError> {
    let (limit, offset, page) = p.paging();
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders \
         WHERE ($1::text IS NULL OR customer_email = $1) \
         AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(&p.email)
    .bind(&p.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders \
         WHERE ($1::text IS NULL OR customer_email = $1) \
         AND ($2::text IS NULL OR status = $2)",
    )
    .bind(&p.email)
    .bind(&p.status)
    .fetch_one(&s.db)
    .await?;
    Ok(Json(PaginatedResponse { data: orders, total: total.0, page }))
}

pub async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(id)
        .fetch_all(&s.db)
        .await?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Admin status update with transition guards. Cancellation restocks the
/// order's items in the same transaction.
pub async fn update_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let to = OrderStatus::parse(&r.status)
        .ok_or_else(|| AppError::Validation(format!("unknown status '{}'", r.status)))?;

    let mut tx = s.db.begin().await?;
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let from = OrderStatus::parse(&order.status)
        .ok_or_else(|| AppError::Validation(format!("order has unknown status '{}'", order.status)))?;
    if !from.can_transition(to) {
        return Err(AppError::InvalidTransition { from: order.status, to: r.status });
    }

    if to == OrderStatus::Cancelled {
        sqlx::query(
            "UPDATE products p SET stock_quantity = p.stock_quantity + oi.quantity, \
             updated_at = NOW() \
             FROM order_items oi WHERE oi.order_id = $1 AND oi.product_id = p.id",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(order = %updated.order_number, from = from.as_str(), to = to.as_str(), "order status updated");
    Ok(Json(updated))
}
