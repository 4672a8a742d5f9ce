//! Process configuration, collected once at startup.

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub mail_from: String,
    pub smtp: Option<SmtpConfig>,
    pub payment: PaymentConfig,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Gateway settings. The secret key resolves settings-table-first with
/// these env values as fallback (see `main`).
#[derive(Clone, Debug, Default)]
pub struct PaymentConfig {
    pub gateway_url: Option<String>,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8083".to_string())
            .parse()
            .context("PORT must be a number")?;

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: std::env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .context("SMTP_PORT must be a number")?,
                username: std::env::var("SMTP_USER").unwrap_or_default(),
                password: std::env::var("SMTP_PASS").unwrap_or_default(),
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            port,
            mail_from: std::env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Storefront <no-reply@storefront.local>".to_string()),
            smtp,
            payment: PaymentConfig {
                gateway_url: std::env::var("PAYMENT_GATEWAY_URL").ok(),
                secret_key: std::env::var("PAYMENT_SECRET_KEY").ok(),
                webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok(),
            },
        })
    }
}
