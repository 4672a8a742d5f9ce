//! Carrier records and delivery estimates.
//!
//! Estimates are a flat calendar offset: today + the carrier's configured
//! base delivery days. No zone or distance logic, no live carrier APIs.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Carrier {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub service_name: Option<String>,
    pub base_delivery_days: i32,
    pub flat_rate: Decimal,
    pub active: bool,
    pub test_mode: bool,
    #[serde(skip_serializing)]
    pub api_credentials: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeliveryEstimate {
    pub carrier_id: Uuid,
    pub carrier_name: String,
    pub shipping_cost: Decimal,
    pub estimated_delivery: NaiveDate,
}

pub fn estimated_delivery(base_delivery_days: i32, today: NaiveDate) -> NaiveDate {
    today + Duration::days(base_delivery_days.max(0) as i64)
}

impl Carrier {
    pub fn estimate(&self, today: NaiveDate) -> DeliveryEstimate {
        DeliveryEstimate {
            carrier_id: self.id,
            carrier_name: self.name.clone(),
            shipping_cost: self.flat_rate,
            estimated_delivery: estimated_delivery(self.base_delivery_days, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_offset_calendar_arithmetic() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        // Crosses a year boundary, no business-day skipping.
        assert_eq!(
            estimated_delivery(5, today),
            NaiveDate::from_ymd_opt(2025, 1, 4).unwrap()
        );
        assert_eq!(estimated_delivery(0, today), today);
        assert_eq!(estimated_delivery(-3, today), today);
    }
}
