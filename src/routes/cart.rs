//! Session-keyed cart endpoints.
//!
//! Each handler hydrates a `CartState` from the rows (live prices and
//! stock, never the values the client last saw), runs the pure reducer,
//! and persists the resulting line. Totals in every response are
//! therefore recomputed server-side.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::cart::{AppliedCoupon, CartAction, CartLine, CartState};
use crate::domain::coupon::{CartProductRef, Coupon, DiscountType};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, sqlx::FromRow)]
pub struct CartRow {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: i32,
    pub stock_quantity: i32,
    pub category_id: Option<Uuid>,
}

impl CartRow {
    fn to_line(&self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            quantity: self.quantity,
            stock_quantity: self.stock_quantity,
        }
    }

    pub fn product_ref(&self) -> CartProductRef {
        CartProductRef { product_id: self.product_id, category_id: self.category_id }
    }
}

pub async fn load_rows(db: &PgPool, session: &str) -> Result<Vec<CartRow>, AppError> {
    let rows = sqlx::query_as::<_, CartRow>(
        "SELECT ci.product_id, p.name, p.price, (p.images)[1] AS image, ci.quantity, \
                p.stock_quantity, p.category_id \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id \
         WHERE ci.session_id = $1 AND p.status = 'active' \
         ORDER BY ci.created_at",
    )
    .bind(session)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn applied_coupon(db: &PgPool, session: &str) -> Result<Option<AppliedCoupon>, AppError> {
    let code: Option<(Option<String>,)> =
        sqlx::query_as("SELECT coupon_code FROM carts WHERE session_id = $1")
            .bind(session)
            .fetch_optional(db)
            .await?;
    let Some((Some(code),)) = code else { return Ok(None) };
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(&code)
        .fetch_optional(db)
        .await?;
    Ok(coupon.and_then(|c| {
        DiscountType::parse(&c.discount_type).map(|discount_type| AppliedCoupon {
            code: c.code,
            discount_type,
            discount_value: c.discount_value,
            maximum_discount_amount: c.maximum_discount_amount,
        })
    }))
}

async fn hydrate(db: &PgPool, session: &str) -> Result<CartState, AppError> {
    let lines = load_rows(db, session).await?.iter().map(CartRow::to_line).collect();
    let coupon = applied_coupon(db, session).await?;
    Ok(CartState::new(lines, coupon))
}

async fn ensure_cart(db: &PgPool, session: &str) -> Result<(), AppError> {
    sqlx::query("INSERT INTO carts (session_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(session)
        .execute(db)
        .await?;
    Ok(())
}

/// Writes the reducer's post-transition quantity for one product back to
/// the row, or deletes the row if the line is gone.
async fn save_line(
    db: &PgPool,
    session: &str,
    product_id: Uuid,
    state: &CartState,
) -> Result<(), AppError> {
    match state.items.iter().find(|i| i.product_id == product_id) {
        Some(line) => {
            sqlx::query(
                "INSERT INTO cart_items (id, session_id, product_id, quantity) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (session_id, product_id) DO UPDATE SET quantity = $4",
            )
            .bind(Uuid::now_v7())
            .bind(session)
            .bind(product_id)
            .bind(line.quantity)
            .execute(db)
            .await?;
        }
        None => {
            sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2")
                .bind(session)
                .bind(product_id)
                .execute(db)
                .await?;
        }
    }
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE session_id = $1")
        .bind(session)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn get_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<CartState>, AppError> {
    Ok(Json(hydrate(&s.db, &session).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: Option<i32>,
}

pub async fn add_item(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartState>), AppError> {
    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id AS product_id, name, price, (images)[1] AS image, 0 AS quantity, \
                stock_quantity, category_id \
         FROM products WHERE id = $1 AND status = 'active'",
    )
    .bind(r.product_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("product"))?;
    if row.stock_quantity <= 0 {
        return Err(AppError::InsufficientStock(r.product_id));
    }

    ensure_cart(&s.db, &session).await?;
    let mut line = row.to_line();
    line.quantity = r.quantity.unwrap_or(1);
    let state = hydrate(&s.db, &session).await?.apply(CartAction::AddItem(line));
    save_line(&s.db, &session, r.product_id, &state).await?;
    Ok((StatusCode::CREATED, Json(state)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

pub async fn update_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<Json<CartState>, AppError> {
    let state = hydrate(&s.db, &session).await?;
    if !state.items.iter().any(|i| i.product_id == product_id) {
        return Err(AppError::NotFound("cart item"));
    }
    let state =
        state.apply(CartAction::UpdateQuantity { product_id, quantity: r.quantity });
    save_line(&s.db, &session, product_id, &state).await?;
    Ok(Json(state))
}

pub async fn remove_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
) -> Result<Json<CartState>, AppError> {
    let state = hydrate(&s.db, &session).await?.apply(CartAction::RemoveItem { product_id });
    save_line(&s.db, &session, product_id, &state).await?;
    Ok(Json(state))
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

pub async fn apply_coupon(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<ApplyCouponRequest>,
) -> Result<Json<CartState>, AppError> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(r.code.trim())
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("coupon"))?;

    let rows = load_rows(&s.db, &session).await?;
    let state = CartState::new(rows.iter().map(CartRow::to_line).collect(), None);
    if state.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }
    let refs: Vec<CartProductRef> = rows.iter().map(CartRow::product_ref).collect();
    coupon.validate(&refs, state.subtotal, Utc::now())?;

    ensure_cart(&s.db, &session).await?;
    sqlx::query("UPDATE carts SET coupon_code = $2, updated_at = NOW() WHERE session_id = $1")
        .bind(&session)
        .bind(&coupon.code)
        .execute(&s.db)
        .await?;

    let discount_type =
        DiscountType::parse(&coupon.discount_type).unwrap_or(DiscountType::FixedAmount);
    Ok(Json(state.apply(CartAction::ApplyCoupon(AppliedCoupon {
        code: coupon.code,
        discount_type,
        discount_value: coupon.discount_value,
        maximum_discount_amount: coupon.maximum_discount_amount,
    }))))
}

pub async fn remove_coupon(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<CartState>, AppError> {
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = NOW() WHERE session_id = $1")
        .bind(&session)
        .execute(&s.db)
        .await?;
    Ok(Json(hydrate(&s.db, &session).await?.apply(CartAction::RemoveCoupon)))
}

pub async fn clear(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<StatusCode, AppError> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&session)
        .execute(&s.db)
        .await?;
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = NOW() WHERE session_id = $1")
        .bind(&session)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
