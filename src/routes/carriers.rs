//! Shipping carriers: public estimates and admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::shipping::{Carrier, DeliveryEstimate};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EstimateParams {
    // Accepted for API compatibility; the flat-offset estimator does not
    // use destination data.
    #[allow(dead_code)]
    pub zip: Option<String>,
    #[allow(dead_code)]
    pub country: Option<String>,
}

/// Active carriers with a delivery estimate for each.
pub async fn list_active(
    State(s): State<AppState>,
    Query(_p): Query<EstimateParams>,
) -> Result<Json<Vec<DeliveryEstimate>>, AppError> {
    let carriers = sqlx::query_as::<_, Carrier>(
        "SELECT * FROM carriers WHERE active ORDER BY base_delivery_days, name",
    )
    .fetch_all(&s.db)
    .await?;
    let today = Utc::now().date_naive();
    Ok(Json(carriers.iter().map(|c| c.estimate(today)).collect()))
}

pub async fn estimate(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Query(_p): Query<EstimateParams>,
) -> Result<Json<DeliveryEstimate>, AppError> {
    let carrier = sqlx::query_as::<_, Carrier>("SELECT * FROM carriers WHERE id = $1 AND active")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("carrier"))?;
    Ok(Json(carrier.estimate(Utc::now().date_naive())))
}

pub async fn list_all(State(s): State<AppState>) -> Result<Json<Vec<Carrier>>, AppError> {
    let carriers = sqlx::query_as::<_, Carrier>("SELECT * FROM carriers ORDER BY name")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(carriers))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertCarrierRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 30))]
    pub code: String,
    pub service_name: Option<String>,
    pub base_delivery_days: i32,
    pub flat_rate: Option<Decimal>,
    pub active: Option<bool>,
    pub test_mode: Option<bool>,
    pub api_credentials: Option<serde_json::Value>,
}

impl UpsertCarrierRequest {
    fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.base_delivery_days < 0 {
            return Err(AppError::Validation("base_delivery_days must not be negative".into()));
        }
        if self.flat_rate.unwrap_or(Decimal::ZERO) < Decimal::ZERO {
            return Err(AppError::Validation("flat_rate must not be negative".into()));
        }
        Ok(())
    }
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<UpsertCarrierRequest>,
) -> Result<(StatusCode, Json<Carrier>), AppError> {
    r.check()?;
    let c = sqlx::query_as::<_, Carrier>(
        "INSERT INTO carriers (id, name, code, service_name, base_delivery_days, flat_rate, \
         active, test_mode, api_credentials) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(r.code.trim().to_lowercase())
    .bind(&r.service_name)
    .bind(r.base_delivery_days)
    .bind(r.flat_rate.unwrap_or(Decimal::ZERO))
    .bind(r.active.unwrap_or(true))
    .bind(r.test_mode.unwrap_or(false))
    .bind(&r.api_credentials)
    .fetch_one(&s.db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("carrier code already exists".into())
        }
        other => AppError::Database(other),
    })?;
    Ok((StatusCode::CREATED, Json(c)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpsertCarrierRequest>,
) -> Result<Json<Carrier>, AppError> {
    r.check()?;
    sqlx::query_as::<_, Carrier>(
        "UPDATE carriers SET name = $2, code = $3, service_name = $4, base_delivery_days = $5, \
         flat_rate = $6, active = $7, test_mode = $8, api_credentials = $9 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(r.code.trim().to_lowercase())
    .bind(&r.service_name)
    .bind(r.base_delivery_days)
    .bind(r.flat_rate.unwrap_or(Decimal::ZERO))
    .bind(r.active.unwrap_or(true))
    .bind(r.test_mode.unwrap_or(false))
    .bind(&r.api_credentials)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("carrier"))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("UPDATE carriers SET active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("carrier"));
    }
    Ok(StatusCode::NO_CONTENT)
}
