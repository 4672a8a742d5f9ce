//! Coupon validation endpoint and admin CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::cart::{self, CartRow};
use crate::domain::coupon::{CartProductRef, Coupon, DiscountType};
use crate::domain::money;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub session_id: String,
}

/// Dry-run validation against the caller's current cart. Returns the
/// discriminated result with HTTP 200 either way; no usage is consumed.
pub async fn validate(
    State(s): State<AppState>,
    Json(r): Json<ValidateCouponRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    r.validate()?;
    let Some(coupon) = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(r.code.trim())
        .fetch_optional(&s.db)
        .await?
    else {
        return Ok(Json(json!({ "valid": false, "error": "coupon not found", "code": "coupon_not_found" })));
    };

    let rows = cart::load_rows(&s.db, &r.session_id).await?;
    // Same rule as applying to the cart: nothing to discount, no verdict
    // that could flip once items appear.
    if rows.is_empty() {
        return Ok(Json(json!({ "valid": false, "error": "cart is empty", "code": "cart_empty" })));
    }
    let subtotal = money::subtotal(rows.iter().map(|row| (row.price, row.quantity)));
    let refs: Vec<CartProductRef> = rows.iter().map(CartRow::product_ref).collect();

    match coupon.validate(&refs, subtotal, Utc::now()) {
        Ok(discount) => Ok(Json(json!({
            "valid": true,
            "discount": discount,
            "coupon": {
                "code": coupon.code,
                "discount_type": coupon.discount_type,
                "discount_value": coupon.discount_value,
            },
        }))),
        Err(rejection) => Ok(Json(json!({
            "valid": false,
            "error": rejection.to_string(),
            "code": rejection.code(),
        }))),
    }
}

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<Coupon>>, AppError> {
    let coupons = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(coupons))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertCouponRequest {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub minimum_order_amount: Decimal,
    pub maximum_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applies_to_categories: Vec<Uuid>,
    #[serde(default)]
    pub applies_to_products: Vec<Uuid>,
    pub is_active: Option<bool>,
}

impl UpsertCouponRequest {
    fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.discount_value <= Decimal::ZERO {
            return Err(AppError::Validation("discount_value must be positive".into()));
        }
        if self.discount_type == DiscountType::Percentage
            && self.discount_value > Decimal::from(100)
        {
            return Err(AppError::Validation("percentage discount cannot exceed 100".into()));
        }
        Ok(())
    }
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<UpsertCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), AppError> {
    r.check()?;
    let c = sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupons (id, code, discount_type, discount_value, minimum_order_amount, \
         maximum_discount_amount, usage_limit, valid_from, valid_until, applies_to_categories, \
         applies_to_products, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()), $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.code.trim().to_uppercase())
    .bind(r.discount_type.as_str())
    .bind(r.discount_value)
    .bind(r.minimum_order_amount)
    .bind(r.maximum_discount_amount)
    .bind(r.usage_limit)
    .bind(r.valid_from)
    .bind(r.valid_until)
    .bind(&r.applies_to_categories)
    .bind(&r.applies_to_products)
    .bind(r.is_active.unwrap_or(true))
    .fetch_one(&s.db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("coupon code already exists".into())
        }
        other => AppError::Database(other),
    })?;
    tracing::info!(code = %c.code, "coupon created");
    Ok((StatusCode::CREATED, Json(c)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpsertCouponRequest>,
) -> Result<Json<Coupon>, AppError> {
    r.check()?;
    sqlx::query_as::<_, Coupon>(
        "UPDATE coupons SET code = $2, discount_type = $3, discount_value = $4, \
         minimum_order_amount = $5, maximum_discount_amount = $6, usage_limit = $7, \
         valid_from = COALESCE($8, valid_from), valid_until = $9, applies_to_categories = $10, \
         applies_to_products = $11, is_active = $12 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(r.code.trim().to_uppercase())
    .bind(r.discount_type.as_str())
    .bind(r.discount_value)
    .bind(r.minimum_order_amount)
    .bind(r.maximum_discount_amount)
    .bind(r.usage_limit)
    .bind(r.valid_from)
    .bind(r.valid_until)
    .bind(&r.applies_to_categories)
    .bind(&r.applies_to_products)
    .bind(r.is_active.unwrap_or(true))
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("coupon"))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&s.db).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("coupon"));
    }
    Ok(StatusCode::NO_CONTENT)
}
