//! Storefront Commerce Service
//!
//! Self-hosted storefront and admin back-office API.
//!
//! ## Features
//! - Product catalog, categories, and search
//! - Session carts with coupon application
//! - Server-verified checkout with transactional stock/coupon accounting
//! - Order lifecycle management
//! - Carrier delivery estimates
//! - Reviews, wishlists, newsletter subscriptions
//! - Admin settings, users, and contact inbox

pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod payments;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;
