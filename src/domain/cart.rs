//! Cart state reducer.
//!
//! A pure function of `(state, action) -> state`. Every transition
//! recomputes `subtotal`, `discount_amount`, and `discounted_total`.
//! Quantities are clamped to `[1, stock_quantity]`; an update to zero
//! removes the line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coupon::DiscountType;
use super::money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: i32,
    pub stock_quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        money::line_total(self.price, self.quantity)
    }
}

/// Coupon terms carried in cart state. The discount amount is derived
/// from these on every transition rather than stored, so it tracks the
/// current subtotal as lines change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub maximum_discount_amount: Option<Decimal>,
}

impl AppliedCoupon {
    fn discount_for(&self, subtotal: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => {
                let raw = subtotal * self.discount_value / Decimal::from(100);
                match self.maximum_discount_amount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::FixedAmount => self.discount_value.min(subtotal),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<CartLine>,
    pub coupon: Option<AppliedCoupon>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub discounted_total: Decimal,
}

#[derive(Clone, Debug)]
pub enum CartAction {
    AddItem(CartLine),
    UpdateQuantity { product_id: Uuid, quantity: i32 },
    RemoveItem { product_id: Uuid },
    ApplyCoupon(AppliedCoupon),
    RemoveCoupon,
    Clear,
}

impl CartState {
    pub fn new(items: Vec<CartLine>, coupon: Option<AppliedCoupon>) -> Self {
        let mut state = Self { items, coupon, ..Self::default() };
        state.recalculate();
        state
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn apply(mut self, action: CartAction) -> Self {
        match action {
            CartAction::AddItem(line) => {
                let stock = line.stock_quantity;
                if let Some(existing) =
                    self.items.iter_mut().find(|i| i.product_id == line.product_id)
                {
                    existing.quantity = clamp_quantity(existing.quantity + line.quantity, stock);
                    existing.price = line.price;
                    existing.stock_quantity = stock;
                } else {
                    let mut line = line;
                    line.quantity = clamp_quantity(line.quantity, stock);
                    self.items.push(line);
                }
            }
            CartAction::UpdateQuantity { product_id, quantity } => {
                if quantity == 0 {
                    self.items.retain(|i| i.product_id != product_id);
                } else if let Some(item) =
                    self.items.iter_mut().find(|i| i.product_id == product_id)
                {
                    item.quantity = clamp_quantity(quantity, item.stock_quantity);
                }
            }
            CartAction::RemoveItem { product_id } => {
                self.items.retain(|i| i.product_id != product_id);
            }
            CartAction::ApplyCoupon(coupon) => self.coupon = Some(coupon),
            CartAction::RemoveCoupon => self.coupon = None,
            CartAction::Clear => {
                self.items.clear();
                self.coupon = None;
            }
        }
        self.recalculate();
        self
    }

    fn recalculate(&mut self) {
        self.subtotal = money::subtotal(self.items.iter().map(|i| (i.price, i.quantity)));
        self.discount_amount = self
            .coupon
            .as_ref()
            .map(|c| c.discount_for(self.subtotal))
            .unwrap_or(Decimal::ZERO);
        self.discounted_total = (self.subtotal - self.discount_amount).max(Decimal::ZERO);
    }
}

fn clamp_quantity(requested: i32, stock: i32) -> i32 {
    requested.clamp(1, stock.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, stock: i32, dollars: i64) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            name: "Widget".into(),
            price: Decimal::new(dollars, 0),
            image: None,
            quantity,
            stock_quantity: stock,
        }
    }

    #[test]
    fn test_add_merges_and_clamps_to_stock() {
        // stock 3, already have 3, request 2 more: stays at 3
        let first = line(3, 3, 10);
        let id = first.product_id;
        let state = CartState::default().apply(CartAction::AddItem(first.clone()));
        let state = state.apply(CartAction::AddItem(CartLine { quantity: 2, ..first }));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].quantity, 3);
        assert_eq!(state.subtotal, Decimal::new(30, 0));

        // direct update past stock clamps too
        let state = state.apply(CartAction::UpdateQuantity { product_id: id, quantity: 5 });
        assert_eq!(state.items[0].quantity, 3);
    }

    #[test]
    fn test_update_to_zero_removes_negative_clamps_to_one() {
        let item = line(2, 10, 10);
        let id = item.product_id;
        let state = CartState::default().apply(CartAction::AddItem(item));

        let negative = state.clone().apply(CartAction::UpdateQuantity { product_id: id, quantity: -4 });
        assert_eq!(negative.items[0].quantity, 1);

        let removed = state.apply(CartAction::UpdateQuantity { product_id: id, quantity: 0 });
        assert!(removed.is_empty());
        assert_eq!(removed.subtotal, Decimal::ZERO);
    }

    #[test]
    fn test_remove_item_recomputes() {
        let a = line(1, 5, 10);
        let b = line(2, 5, 20);
        let state = CartState::new(vec![a.clone(), b], None);
        assert_eq!(state.subtotal, Decimal::new(50, 0));
        let state = state.apply(CartAction::RemoveItem { product_id: a.product_id });
        assert_eq!(state.subtotal, Decimal::new(40, 0));
    }

    #[test]
    fn test_coupon_tracks_subtotal() {
        let a = line(1, 5, 100);
        let state = CartState::new(vec![a.clone()], None).apply(CartAction::ApplyCoupon(
            AppliedCoupon {
                code: "SAVE20".into(),
                discount_type: DiscountType::Percentage,
                discount_value: Decimal::new(20, 0),
                maximum_discount_amount: Some(Decimal::new(15, 0)),
            },
        ));
        assert_eq!(state.discount_amount, Decimal::new(15, 0));
        assert_eq!(state.discounted_total, Decimal::new(85, 0));

        // Dropping the only line takes the discount to zero with it.
        let state = state.apply(CartAction::RemoveItem { product_id: a.product_id });
        assert_eq!(state.discount_amount, Decimal::ZERO);
        assert_eq!(state.discounted_total, Decimal::ZERO);
    }

    #[test]
    fn test_fixed_coupon_floors_total_at_zero() {
        let state = CartState::new(vec![line(1, 5, 10)], Some(AppliedCoupon {
            code: "BIG".into(),
            discount_type: DiscountType::FixedAmount,
            discount_value: Decimal::new(50, 0),
            maximum_discount_amount: None,
        }));
        assert_eq!(state.discount_amount, Decimal::new(10, 0));
        assert_eq!(state.discounted_total, Decimal::ZERO);
    }

    #[test]
    fn test_clear_resets_everything() {
        let state = CartState::new(vec![line(2, 5, 10)], Some(AppliedCoupon {
            code: "X".into(),
            discount_type: DiscountType::FixedAmount,
            discount_value: Decimal::new(5, 0),
            maximum_discount_amount: None,
        }));
        let state = state.apply(CartAction::Clear);
        assert!(state.is_empty());
        assert!(state.coupon.is_none());
        assert_eq!(state.discounted_total, Decimal::ZERO);
    }
}
