//! Thin payment-gateway client.
//!
//! Creates payment intents against a configured HTTP gateway. Amounts
//! cross the wire as integer cents. When no gateway is configured the
//! client runs in test mode and mints local intents, so checkout works
//! in development without a gateway.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub struct PaymentClient {
    http: reqwest::Client,
    gateway_url: Option<String>,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Serialize)]
struct CreateIntentRequest<'a> {
    amount: i64,
    currency: &'a str,
    reference: &'a str,
}

impl PaymentClient {
    pub fn new(
        gateway_url: Option<String>,
        secret_key: Option<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        if gateway_url.is_none() || secret_key.is_none() {
            tracing::warn!("payment gateway not configured, running in test mode");
        }
        Self { http: reqwest::Client::new(), gateway_url, secret_key, webhook_secret }
    }

    pub async fn create_intent(
        &self,
        order_number: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, AppError> {
        let (Some(url), Some(key)) = (&self.gateway_url, &self.secret_key) else {
            return Ok(test_intent(amount_cents, currency));
        };
        let request = CreateIntentRequest { amount: amount_cents, currency, reference: order_number };
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", url.trim_end_matches('/')))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::Payment(format!("gateway returned {}", response.status())));
        }
        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| AppError::Payment(e.to_string()))
    }

    /// Shared-secret webhook check. Open when no secret is configured
    /// (test mode).
    pub fn verify_webhook(&self, provided: Option<&str>) -> bool {
        match (&self.webhook_secret, provided) {
            (Some(secret), Some(provided)) => {
                constant_time_eq(secret.as_bytes(), provided.as_bytes())
            }
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Byte comparison that does not short-circuit on the first mismatch, so
/// response timing leaks nothing about how much of the secret matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn test_intent(amount_cents: i64, currency: &str) -> PaymentIntent {
    let id = format!("pi_test_{}", Uuid::new_v4().simple());
    PaymentIntent {
        client_secret: format!("{id}_secret"),
        id,
        amount_cents,
        currency: currency.to_string(),
        status: "requires_payment".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_verification() {
        let client = PaymentClient::new(None, None, Some("whsec_abc".into()));
        assert!(client.verify_webhook(Some("whsec_abc")));
        assert!(!client.verify_webhook(Some("wrong")));
        assert!(!client.verify_webhook(None));

        let open = PaymentClient::new(None, None, None);
        assert!(open.verify_webhook(None));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"whsec_abc", b"whsec_abc"));
        assert!(!constant_time_eq(b"whsec_abc", b"whsec_abd"));
        assert!(!constant_time_eq(b"whsec_abc", b"whsec_ab"));
        assert!(!constant_time_eq(b"", b"x"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn test_unconfigured_client_mints_test_intent() {
        let client = PaymentClient::new(None, None, None);
        let intent = client.create_intent("ORD-00000001", 8500, "USD").await.unwrap();
        assert!(intent.id.starts_with("pi_test_"));
        assert_eq!(intent.amount_cents, 8500);
        assert_eq!(intent.status, "requires_payment");
    }
}
