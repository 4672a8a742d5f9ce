//! Business-rule layer. Pure computation, no I/O.

pub mod cart;
pub mod coupon;
pub mod money;
pub mod order;
pub mod shipping;
