//! Coupon validation and discount computation.
//!
//! Validation is pure and side-effect free. Redemption (the guarded
//! `usage_count` increment) happens separately, inside the checkout
//! transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(Self::Percentage),
            "fixed_amount" => Some(Self::FixedAmount),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub minimum_order_amount: Decimal,
    pub maximum_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub applies_to_categories: Vec<Uuid>,
    pub applies_to_products: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// What the validator needs to know about a cart line to decide
/// applicability against the coupon's allow-lists.
#[derive(Clone, Copy, Debug)]
pub struct CartProductRef {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not yet valid")]
    NotYetValid,
    #[error("coupon has expired")]
    Expired,
    #[error("order subtotal is below the coupon minimum of {minimum}")]
    BelowMinimum { minimum: Decimal },
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("coupon does not apply to any item in the cart")]
    NotApplicable,
}

impl CouponRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Inactive => "coupon_inactive",
            Self::NotYetValid => "coupon_not_yet_valid",
            Self::Expired => "coupon_expired",
            Self::BelowMinimum { .. } => "coupon_below_minimum",
            Self::UsageLimitReached => "coupon_usage_limit",
            Self::NotApplicable => "coupon_not_applicable",
        }
    }
}

impl Coupon {
    /// Checks every redemption rule against the cart and returns the
    /// discount amount this coupon would grant on `subtotal`.
    pub fn validate(
        &self,
        items: &[CartProductRef],
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if now < self.valid_from {
            return Err(CouponRejection::NotYetValid);
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return Err(CouponRejection::Expired);
            }
        }
        if subtotal < self.minimum_order_amount {
            return Err(CouponRejection::BelowMinimum { minimum: self.minimum_order_amount });
        }
        if let Some(limit) = self.usage_limit {
            if self.usage_count >= limit {
                return Err(CouponRejection::UsageLimitReached);
            }
        }
        if !self.applies_to(items) {
            return Err(CouponRejection::NotApplicable);
        }
        Ok(self.discount_for(subtotal))
    }

    /// Empty allow-lists mean the coupon is unrestricted.
    fn applies_to(&self, items: &[CartProductRef]) -> bool {
        if self.applies_to_categories.is_empty() && self.applies_to_products.is_empty() {
            return true;
        }
        items.iter().any(|item| {
            self.applies_to_products.contains(&item.product_id)
                || item
                    .category_id
                    .is_some_and(|c| self.applies_to_categories.contains(&c))
        })
    }

    /// Percentage: `subtotal * value / 100`, clamped to the optional cap.
    /// Fixed: `min(value, subtotal)` so the discount never exceeds the order.
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        match DiscountType::parse(&self.discount_type) {
            Some(DiscountType::Percentage) => {
                let raw = subtotal * self.discount_value / Decimal::from(100);
                match self.maximum_discount_amount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            Some(DiscountType::FixedAmount) => self.discount_value.min(subtotal),
            None => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(discount_type: &str, value: Decimal) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "SAVE".into(),
            discount_type: discount_type.into(),
            discount_value: value,
            minimum_order_amount: Decimal::ZERO,
            maximum_discount_amount: None,
            usage_limit: None,
            usage_count: 0,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: None,
            applies_to_categories: vec![],
            applies_to_products: vec![],
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn item() -> CartProductRef {
        CartProductRef { product_id: Uuid::new_v4(), category_id: None }
    }

    #[test]
    fn test_percentage_clamped_to_cap() {
        // $100 subtotal, 20% off, capped at $15.
        let mut c = coupon("percentage", Decimal::new(20, 0));
        c.maximum_discount_amount = Some(Decimal::new(15, 0));
        let d = c.validate(&[item()], Decimal::new(100, 0), Utc::now()).unwrap();
        assert_eq!(d, Decimal::new(15, 0));
    }

    #[test]
    fn test_percentage_uncapped() {
        let c = coupon("percentage", Decimal::new(20, 0));
        let d = c.validate(&[item()], Decimal::new(100, 0), Utc::now()).unwrap();
        assert_eq!(d, Decimal::new(20, 0));
    }

    #[test]
    fn test_fixed_never_exceeds_subtotal() {
        let c = coupon("fixed_amount", Decimal::new(50, 0));
        let d = c.validate(&[item()], Decimal::new(30, 0), Utc::now()).unwrap();
        assert_eq!(d, Decimal::new(30, 0));
    }

    #[test]
    fn test_below_minimum() {
        let mut c = coupon("percentage", Decimal::new(10, 0));
        c.minimum_order_amount = Decimal::new(50, 0);
        let err = c.validate(&[item()], Decimal::new(40, 0), Utc::now()).unwrap_err();
        assert_eq!(err, CouponRejection::BelowMinimum { minimum: Decimal::new(50, 0) });
    }

    #[test]
    fn test_usage_limit_reached() {
        let mut c = coupon("percentage", Decimal::new(10, 0));
        c.usage_limit = Some(5);
        c.usage_count = 5;
        let err = c.validate(&[item()], Decimal::new(100, 0), Utc::now()).unwrap_err();
        assert_eq!(err, CouponRejection::UsageLimitReached);
    }

    #[test]
    fn test_expired_and_open_ended() {
        let mut c = coupon("percentage", Decimal::new(10, 0));
        c.valid_until = Some(Utc::now() - Duration::hours(1));
        assert_eq!(
            c.validate(&[item()], Decimal::new(100, 0), Utc::now()).unwrap_err(),
            CouponRejection::Expired
        );
        c.valid_until = None;
        assert!(c.validate(&[item()], Decimal::new(100, 0), Utc::now()).is_ok());
    }

    #[test]
    fn test_not_yet_valid() {
        let mut c = coupon("percentage", Decimal::new(10, 0));
        c.valid_from = Utc::now() + Duration::days(1);
        assert_eq!(
            c.validate(&[item()], Decimal::new(100, 0), Utc::now()).unwrap_err(),
            CouponRejection::NotYetValid
        );
    }

    #[test]
    fn test_inactive() {
        let mut c = coupon("percentage", Decimal::new(10, 0));
        c.is_active = false;
        assert_eq!(
            c.validate(&[item()], Decimal::new(100, 0), Utc::now()).unwrap_err(),
            CouponRejection::Inactive
        );
    }

    #[test]
    fn test_allow_lists() {
        let target = item();
        let other = item();
        let mut c = coupon("percentage", Decimal::new(10, 0));
        c.applies_to_products = vec![target.product_id];
        assert!(c.validate(&[target], Decimal::new(100, 0), Utc::now()).is_ok());
        assert_eq!(
            c.validate(&[other], Decimal::new(100, 0), Utc::now()).unwrap_err(),
            CouponRejection::NotApplicable
        );

        let cat = Uuid::new_v4();
        let in_cat = CartProductRef { product_id: Uuid::new_v4(), category_id: Some(cat) };
        let mut c2 = coupon("percentage", Decimal::new(10, 0));
        c2.applies_to_categories = vec![cat];
        assert!(c2.validate(&[in_cat], Decimal::new(100, 0), Utc::now()).is_ok());
    }
}
