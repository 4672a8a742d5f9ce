//! Order numbering, status lifecycle, and authoritative totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money;

pub fn generate_order_number() -> String {
    format!("ORD-{:08}", rand::random::<u32>() % 100_000_000)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Forward progression plus cancellation at any point before delivery.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, to) {
            (Pending, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (Pending | Processing | Shipped, Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Totals recomputed server-side from authoritative rows at checkout.
/// Client-supplied amounts are never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn compute(
        lines: impl IntoIterator<Item = (Decimal, i32)>,
        discount: Decimal,
        shipping: Decimal,
    ) -> Self {
        let subtotal = money::subtotal(lines);
        let discount = discount.min(subtotal).max(Decimal::ZERO);
        Self { subtotal, discount, shipping, total: money::order_total(subtotal, discount, shipping) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let n = generate_order_number();
        assert!(n.starts_with("ORD-"));
        assert_eq!(n.len(), 12);
        assert!(n[4..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Delivered));
        assert!(Processing.can_transition(Cancelled));
        assert!(!Delivered.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Processing));
        assert!(!Pending.can_transition(Shipped));
    }

    #[test]
    fn test_totals_compute() {
        let t = OrderTotals::compute(
            [(Decimal::new(40, 0), 2), (Decimal::new(20, 0), 1)],
            Decimal::new(15, 0),
            Decimal::new(5, 0),
        );
        assert_eq!(t.subtotal, Decimal::new(100, 0));
        assert_eq!(t.discount, Decimal::new(15, 0));
        assert_eq!(t.total, Decimal::new(90, 0));
    }

    #[test]
    fn test_totals_discount_clamped() {
        let t = OrderTotals::compute([(Decimal::new(10, 0), 1)], Decimal::new(25, 0), Decimal::ZERO);
        assert_eq!(t.discount, Decimal::new(10, 0));
        assert_eq!(t.total, Decimal::ZERO);
    }
}
