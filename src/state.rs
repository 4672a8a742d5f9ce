//! Shared application state.
//!
//! Every external client is constructed once in `main` and injected here.
//! No lazy first-call initialization.

use std::sync::Arc;

use crate::email::Mailer;
use crate::payments::PaymentClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub mailer: Arc<Mailer>,
    pub payments: Arc<PaymentClient>,
}
