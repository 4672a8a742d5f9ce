//! Checkout orchestrator.
//!
//! Totals are recomputed here from authoritative product, coupon, and
//! carrier rows; amounts supplied by the client are never persisted.
//! Stock decrement, coupon redemption, order insert, and cart clearing
//! share a single transaction, so a concurrent checkout that exhausts
//! stock or a usage-limited coupon rolls the whole attempt back.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::cart::{self, CartRow};
use super::orders::Order;
use super::settings;
use crate::domain::coupon::{CartProductRef, Coupon, CouponRejection};
use crate::domain::money;
use crate::domain::order::{generate_order_number, OrderTotals};
use crate::domain::shipping::Carrier;
use crate::email;
use crate::error::AppError;
use crate::payments::PaymentIntent;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub zip: String,
    #[validate(length(min = 1))]
    pub country: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    pub session_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub user_id: Option<Uuid>,
    pub carrier_id: Uuid,
    #[validate]
    pub shipping_address: Address,
    #[validate]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order: Order,
    pub payment: Option<PaymentIntent>,
}

pub async fn checkout(
    State(s): State<AppState>,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    r.validate()?;

    let rows = cart::load_rows(&s.db, &r.session_id).await?;
    if rows.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }
    let subtotal = money::subtotal(rows.iter().map(|row| (row.price, row.quantity)));

    // Coupon attached to the cart, revalidated against live rows.
    let coupon_code: Option<(Option<String>,)> =
        sqlx::query_as("SELECT coupon_code FROM carts WHERE session_id = $1")
            .bind(&r.session_id)
            .fetch_optional(&s.db)
            .await?;
    let coupon = match coupon_code.and_then(|(c,)| c) {
        Some(code) => sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
            .bind(&code)
            .fetch_optional(&s.db)
            .await?,
        None => None,
    };
    let refs: Vec<CartProductRef> = rows.iter().map(CartRow::product_ref).collect();
    let discount = match &coupon {
        Some(c) => c.validate(&refs, subtotal, Utc::now())?,
        None => rust_decimal::Decimal::ZERO,
    };

    let carrier = sqlx::query_as::<_, Carrier>("SELECT * FROM carriers WHERE id = $1 AND active")
        .bind(r.carrier_id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("carrier"))?;
    let delivery = carrier.estimate(Utc::now().date_naive());

    let totals = OrderTotals::compute(
        rows.iter().map(|row| (row.price, row.quantity)),
        discount,
        carrier.flat_rate,
    );
    let order_number = generate_order_number();

    let mut tx = s.db.begin().await?;

    for row in &rows {
        let result = sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
             WHERE id = $1 AND stock_quantity >= $2",
        )
        .bind(row.product_id)
        .bind(row.quantity)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::InsufficientStock(row.product_id));
        }
    }

    if let Some(c) = &coupon {
        let result = sqlx::query(
            "UPDATE coupons SET usage_count = usage_count + 1 \
             WHERE id = $1 AND is_active \
             AND (usage_limit IS NULL OR usage_count < usage_limit)",
        )
        .bind(c.id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Coupon(CouponRejection::UsageLimitReached));
        }
    }

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, user_id, customer_email, customer_name, \
         subtotal, discount, shipping, total, coupon_code, carrier_id, estimated_delivery, \
         shipping_address, billing_address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&order_number)
    .bind(r.user_id)
    .bind(r.email.trim())
    .bind(r.name.trim())
    .bind(totals.subtotal)
    .bind(totals.discount)
    .bind(totals.shipping)
    .bind(totals.total)
    .bind(coupon.as_ref().map(|c| c.code.clone()))
    .bind(carrier.id)
    .bind(delivery.estimated_delivery)
    .bind(json!(r.shipping_address))
    .bind(json!(r.billing_address.as_ref().unwrap_or(&r.shipping_address)))
    .fetch_one(&mut *tx)
    .await?;

    for row in &rows {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, sku, name, quantity, unit_price, total) \
             SELECT $1, $2, p.id, p.sku, p.name, $3, $4, $5 FROM products p WHERE p.id = $6",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(row.quantity)
        .bind(row.price)
        .bind(money::line_total(row.price, row.quantity))
        .bind(row.product_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&r.session_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = NOW() WHERE session_id = $1")
        .bind(&r.session_id)
        .execute(&mut *tx)
        .await?;

    if let Some(user_id) = r.user_id {
        sqlx::query(
            "UPDATE users SET total_spent = total_spent + $2, order_count = order_count + 1, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(totals.total)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(order = %order.order_number, total = %order.total, "order placed");

    // The order is committed; a gateway hiccup leaves it pending and the
    // customer retries payment, it does not undo the order.
    let payment = match s
        .payments
        .create_intent(&order.order_number, money::to_cents(order.total), &order.currency)
        .await
    {
        Ok(intent) => {
            sqlx::query("UPDATE orders SET payment_ref = $2 WHERE id = $1")
                .bind(order.id)
                .bind(&intent.id)
                .execute(&s.db)
                .await?;
            Some(intent)
        }
        Err(e) => {
            tracing::warn!(order = %order.order_number, error = %e, "payment intent creation failed");
            None
        }
    };

    send_order_placed_email(&s, &order).await;

    Ok((StatusCode::CREATED, Json(CheckoutResponse { success: true, order, payment })))
}

async fn send_order_placed_email(s: &AppState, order: &Order) {
    let email_settings = settings::fetch(&s.db, "email").await.ok().flatten();
    let template = email::template_from_settings(
        email_settings.as_ref(),
        "order_placed_template",
        email::DEFAULT_ORDER_PLACED,
    );
    let delivery = order.estimated_delivery.map(|d| d.to_string()).unwrap_or_default();
    let html = email::render_template(
        &template,
        &[
            ("customer_name", order.customer_name.as_str()),
            ("order_number", order.order_number.as_str()),
            ("total", &order.total.to_string()),
            ("estimated_delivery", &delivery),
        ],
    );
    s.mailer
        .send_best_effort(&order.customer_email, "Your order has been received", html)
        .await;
}
