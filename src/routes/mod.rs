//! HTTP surface. One module per resource, JSON in and out.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub mod carriers;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod contacts;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod subscriptions;
pub mod users;
pub mod webhooks;
pub mod wishlist;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<uuid::Uuid>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub q: Option<String>,
}

impl ListParams {
    /// `(limit, offset, page)` with the usual bounds.
    pub fn paging(&self) -> (i64, i64, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (per_page as i64, ((page - 1) * per_page) as i64, page)
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }),
        )
        // catalog
        .route("/api/v1/products", get(products::list).post(products::create))
        .route(
            "/api/v1/products/:id",
            get(products::get_one).put(products::update).delete(products::remove),
        )
        .route("/api/v1/products/:id/stock", post(products::adjust_stock))
        .route("/api/v1/search", get(products::search))
        .route("/api/v1/categories", get(categories::list).post(categories::create))
        .route("/api/v1/categories/:id", get(categories::get_one))
        // reviews
        .route(
            "/api/v1/products/:id/reviews",
            get(reviews::list).post(reviews::create),
        )
        // cart
        .route("/api/v1/cart/:session", get(cart::get_cart).delete(cart::clear))
        .route("/api/v1/cart/:session/items", post(cart::add_item))
        .route(
            "/api/v1/cart/:session/items/:product_id",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route(
            "/api/v1/cart/:session/coupon",
            post(cart::apply_coupon).delete(cart::remove_coupon),
        )
        // coupons
        .route("/api/v1/coupons/validate", post(coupons::validate))
        .route("/api/v1/admin/coupons", get(coupons::list).post(coupons::create))
        .route(
            "/api/v1/admin/coupons/:id",
            put(coupons::update).delete(coupons::remove),
        )
        // carriers
        .route("/api/v1/carriers", get(carriers::list_active))
        .route("/api/v1/carriers/:id/estimate", get(carriers::estimate))
        .route("/api/v1/admin/carriers", get(carriers::list_all).post(carriers::create))
        .route(
            "/api/v1/admin/carriers/:id",
            put(carriers::update).delete(carriers::remove),
        )
        // checkout and orders
        .route("/api/v1/checkout", post(checkout::checkout))
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/:id", get(orders::get_one))
        .route("/api/v1/admin/orders/:id/status", put(orders::update_status))
        .route("/api/v1/webhooks/payment", post(webhooks::payment))
        // users
        .route("/api/v1/users", post(users::register))
        .route("/api/v1/users/:id", get(users::get_one).put(users::update_profile))
        .route("/api/v1/admin/users", get(users::list))
        .route("/api/v1/admin/users/:id/status", put(users::update_status))
        .route("/api/v1/setup/admin", post(users::setup_admin))
        // wishlist
        .route(
            "/api/v1/users/:id/wishlist",
            get(wishlist::list).post(wishlist::add),
        )
        .route("/api/v1/users/:id/wishlist/:product_id", delete(wishlist::remove))
        // subscriptions
        .route("/api/v1/subscriptions", post(subscriptions::subscribe))
        .route("/api/v1/subscriptions/:email", delete(subscriptions::unsubscribe))
        // contact
        .route("/api/v1/contact", post(contacts::submit))
        .route("/api/v1/admin/contacts", get(contacts::list))
        .route("/api/v1/admin/contacts/:id/read", put(contacts::mark_read))
        // settings
        .route(
            "/api/v1/admin/settings/:key",
            get(settings::get_key).put(settings::update_key),
        )
}
