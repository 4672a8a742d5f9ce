//! Best-effort SMTP notifications.
//!
//! Templates come from the `email` settings key when present, otherwise
//! the built-in defaults. Send failures are logged and swallowed; the
//! order flow never blocks or rolls back on a notification failure.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{Config, SmtpConfig};

pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = match &config.smtp {
            Some(smtp) => Some(build_transport(smtp)?),
            None => {
                tracing::warn!("SMTP not configured, email notifications disabled");
                None
            }
        };
        Ok(Self { transport, from: config.mail_from.clone() })
    }

    /// Sends an HTML email. Failures are logged at `warn` and dropped.
    pub async fn send_best_effort(&self, to: &str, subject: &str, html: String) {
        let Some(transport) = &self.transport else { return };
        let result = async {
            let message = Message::builder()
                .from(self.from.parse()?)
                .to(to.parse()?)
                .subject(subject)
                .header(ContentType::TEXT_HTML)
                .body(html)?;
            transport.send(message).await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(to, subject, error = %e, "email send failed");
        }
    }
}

fn build_transport(smtp: &SmtpConfig) -> anyhow::Result<AsyncSmtpTransport<Tokio1Executor>> {
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
        .port(smtp.port);
    if !smtp.username.is_empty() {
        builder = builder
            .credentials(Credentials::new(smtp.username.clone(), smtp.password.clone()));
    }
    Ok(builder.build())
}

/// Substitutes `{placeholder}` markers. Unknown markers are left as-is.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

pub const DEFAULT_ORDER_PLACED: &str = "\
<h1>Thanks for your order, {customer_name}!</h1>\
<p>Order <strong>{order_number}</strong> has been received.</p>\
<p>Total: ${total}</p>\
<p>Estimated delivery: {estimated_delivery}</p>";

pub const DEFAULT_ORDER_CONFIRMED: &str = "\
<h1>Payment received</h1>\
<p>{customer_name}, your payment for order <strong>{order_number}</strong> is confirmed.</p>\
<p>We are preparing your items for shipment.</p>";

/// Picks a template override out of the `email` settings blob, e.g.
/// `{"order_placed_template": "<h1>...</h1>"}`.
pub fn template_from_settings<'a>(
    settings: Option<&'a serde_json::Value>,
    key: &str,
    default: &'a str,
) -> String {
    settings
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_substitution() {
        let html = render_template(
            "Hi {customer_name}, order {order_number} total ${total}.",
            &[("customer_name", "Ada"), ("order_number", "ORD-00000001"), ("total", "85.00")],
        );
        assert_eq!(html, "Hi Ada, order ORD-00000001 total $85.00.");
    }

    #[test]
    fn test_unknown_placeholder_left_alone() {
        assert_eq!(render_template("{nope}", &[("customer_name", "Ada")]), "{nope}");
    }

    #[test]
    fn test_template_from_settings_fallback() {
        let settings = serde_json::json!({ "order_placed_template": "<p>{order_number}</p>" });
        assert_eq!(
            template_from_settings(Some(&settings), "order_placed_template", DEFAULT_ORDER_PLACED),
            "<p>{order_number}</p>"
        );
        assert_eq!(
            template_from_settings(None, "order_placed_template", DEFAULT_ORDER_PLACED),
            DEFAULT_ORDER_PLACED
        );
    }
}
