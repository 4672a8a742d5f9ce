//! Storefront service entry point.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use storefront::config::Config;
use storefront::email::Mailer;
use storefront::payments::PaymentClient;
use storefront::{routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    // Payment credentials resolve settings-table-first, env fallback.
    let payment_settings = routes::settings::fetch(&db, "payment").await.ok().flatten();
    let setting = |field: &str| {
        payment_settings
            .as_ref()
            .and_then(|v| v.get(field))
            .and_then(|v| v.as_str())
            .map(String::from)
    };
    let payments = PaymentClient::new(
        setting("gateway_url").or_else(|| config.payment.gateway_url.clone()),
        setting("secret_key").or_else(|| config.payment.secret_key.clone()),
        setting("webhook_secret").or_else(|| config.payment.webhook_secret.clone()),
    );
    let mailer = Mailer::from_config(&config)?;

    let state = AppState { db, mailer: Arc::new(mailer), payments: Arc::new(payments) };
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("storefront listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
