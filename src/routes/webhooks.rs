//! Payment gateway callbacks.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::orders::Order;
use super::settings;
use crate::email;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub reference: String,
    pub event: String,
}

/// What a gateway event should do to an order, given its current state.
/// Status transitions stay inside the `can_transition` rules: a cancelled
/// order is never resurrected, its payment is only recorded for refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// Mark paid and move the order to processing.
    Confirm,
    /// Order was cancelled while payment was in flight: record the
    /// payment, keep the order cancelled, flag for refund.
    RecordPaymentOnly,
    /// Mark the payment failed.
    MarkFailed,
    /// Replay or out-of-order event, acknowledge without applying.
    Ignore,
    UnknownEvent,
}

pub(crate) fn settle(order_status: &str, payment_status: &str, event: &str) -> Settlement {
    match event {
        "payment.succeeded" => match payment_status {
            // A failed attempt may be retried; only 'paid' blocks re-applying.
            "pending" | "failed" => {
                if order_status == "cancelled" {
                    Settlement::RecordPaymentOnly
                } else {
                    Settlement::Confirm
                }
            }
            _ => Settlement::Ignore,
        },
        "payment.failed" => {
            if payment_status == "pending" {
                Settlement::MarkFailed
            } else {
                Settlement::Ignore
            }
        }
        _ => Settlement::UnknownEvent,
    }
}

/// Applies the gateway's reported outcome to the order. Replayed events
/// are acknowledged without re-applying.
pub async fn payment(
    State(s): State<AppState>,
    headers: HeaderMap,
    Json(w): Json<PaymentWebhook>,
) -> Result<Json<serde_json::Value>, AppError> {
    let signature = headers.get("x-webhook-signature").and_then(|v| v.to_str().ok());
    if !s.payments.verify_webhook(signature) {
        return Err(AppError::Validation("invalid webhook signature".into()));
    }

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1")
        .bind(&w.reference)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;

    // Each UPDATE repeats the decision's predicate so a concurrent status
    // change between the read and the write cannot widen its effect.
    match settle(&order.status, &order.payment_status, &w.event) {
        Settlement::Confirm => {
            let updated = sqlx::query_as::<_, Order>(
                "UPDATE orders SET payment_status = 'paid', status = 'processing', \
                 updated_at = NOW() \
                 WHERE id = $1 AND payment_status IN ('pending', 'failed') \
                 AND status <> 'cancelled' RETURNING *",
            )
            .bind(order.id)
            .fetch_optional(&s.db)
            .await?;
            if let Some(order) = updated {
                tracing::info!(order = %order.order_number, "payment confirmed");
                send_confirmation_email(&s, &order).await;
            }
        }
        Settlement::RecordPaymentOnly => {
            sqlx::query(
                "UPDATE orders SET payment_status = 'paid', updated_at = NOW() \
                 WHERE id = $1 AND payment_status IN ('pending', 'failed') \
                 AND status = 'cancelled'",
            )
            .bind(order.id)
            .execute(&s.db)
            .await?;
            tracing::warn!(order = %order.order_number, "payment received for cancelled order, refund required");
        }
        Settlement::MarkFailed => {
            sqlx::query(
                "UPDATE orders SET payment_status = 'failed', updated_at = NOW() \
                 WHERE id = $1 AND payment_status = 'pending'",
            )
            .bind(order.id)
            .execute(&s.db)
            .await?;
            tracing::warn!(order = %order.order_number, "payment failed");
        }
        Settlement::Ignore => {
            tracing::debug!(order = %order.order_number, event = %w.event, "webhook event ignored");
        }
        Settlement::UnknownEvent => {
            return Err(AppError::Validation(format!("unknown webhook event '{}'", w.event)));
        }
    }

    Ok(Json(json!({ "success": true })))
}

async fn send_confirmation_email(s: &AppState, order: &Order) {
    let email_settings = settings::fetch(&s.db, "email").await.ok().flatten();
    let template = email::template_from_settings(
        email_settings.as_ref(),
        "order_confirmed_template",
        email::DEFAULT_ORDER_CONFIRMED,
    );
    let html = email::render_template(
        &template,
        &[
            ("customer_name", order.customer_name.as_str()),
            ("order_number", order.order_number.as_str()),
            ("total", &order.total.to_string()),
        ],
    );
    s.mailer
        .send_best_effort(&order.customer_email, "Payment confirmed", html)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_confirms_pending_order() {
        assert_eq!(settle("pending", "pending", "payment.succeeded"), Settlement::Confirm);
    }

    #[test]
    fn test_cancelled_order_is_not_resurrected() {
        // Cancellation already restocked the items; the order must stay
        // cancelled and the payment is recorded for refund.
        assert_eq!(
            settle("cancelled", "pending", "payment.succeeded"),
            Settlement::RecordPaymentOnly
        );
        assert_eq!(
            settle("cancelled", "failed", "payment.succeeded"),
            Settlement::RecordPaymentOnly
        );
    }

    #[test]
    fn test_retry_after_failure_confirms() {
        // failed -> succeeded is a legitimate retry, not a replay.
        assert_eq!(settle("pending", "failed", "payment.succeeded"), Settlement::Confirm);
    }

    #[test]
    fn test_replayed_success_is_ignored() {
        assert_eq!(settle("processing", "paid", "payment.succeeded"), Settlement::Ignore);
        assert_eq!(settle("pending", "refunded", "payment.succeeded"), Settlement::Ignore);
    }

    #[test]
    fn test_failure_only_applies_to_pending() {
        assert_eq!(settle("pending", "pending", "payment.failed"), Settlement::MarkFailed);
        assert_eq!(settle("processing", "paid", "payment.failed"), Settlement::Ignore);
        assert_eq!(settle("pending", "failed", "payment.failed"), Settlement::Ignore);
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert_eq!(settle("pending", "pending", "payment.exploded"), Settlement::UnknownEvent);
    }
}
