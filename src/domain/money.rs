//! Monetary arithmetic over `Decimal` dollars.
//!
//! All amounts are dollar-denominated `NUMERIC` values in the database.
//! The payment gateway speaks integer cents; conversion rounds half-up
//! at two decimal places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity.max(0))
}

pub fn subtotal(lines: impl IntoIterator<Item = (Decimal, i32)>) -> Decimal {
    lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, (price, qty)| acc + line_total(price, qty))
}

/// `max(0, subtotal - discount) + shipping`. The discount can never push
/// the goods portion of an order below zero.
pub fn order_total(subtotal: Decimal, discount: Decimal, shipping: Decimal) -> Decimal {
    (subtotal - discount).max(Decimal::ZERO) + shipping
}

pub fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
        .max(0)
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_subtotal() {
        assert_eq!(line_total(Decimal::new(1999, 2), 3), Decimal::new(5997, 2));
        let sum = subtotal([(Decimal::new(1000, 2), 2), (Decimal::new(550, 2), 1)]);
        assert_eq!(sum, Decimal::new(2550, 2));
    }

    #[test]
    fn test_order_total_floors_at_zero() {
        let total = order_total(Decimal::new(1000, 2), Decimal::new(2000, 2), Decimal::new(499, 2));
        assert_eq!(total, Decimal::new(499, 2));
    }

    #[test]
    fn test_cents_round_trip() {
        assert_eq!(to_cents(Decimal::new(1999, 2)), 1999);
        assert_eq!(to_cents(Decimal::new(10005, 3)), 1001); // 10.005 rounds up
        assert_eq!(from_cents(8500), Decimal::new(85, 0));
    }

    #[test]
    fn test_price_accepts_string_or_number() {
        // Admin payloads historically send prices either way.
        let from_num: Decimal = serde_json::from_str("19.99").unwrap();
        let from_str: Decimal = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(from_num, from_str);
    }
}
