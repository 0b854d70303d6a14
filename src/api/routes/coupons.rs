use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MessageResponse;
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError};
use crate::models::Coupon;
use crate::storage::DocumentStore;
use crate::validation::Validate;

pub async fn list_coupons(State(state): State<AppState>) -> Result<Json<Vec<Coupon>>, ApiError> {
    let mut coupons = state.store.find_all::<Coupon>().await?;
    coupons.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(coupons))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    pub name: String,
    pub discount: f64,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

pub async fn create_coupon(
    State(state): State<AppState>,
    payload: Result<Json<CouponRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let Json(req) = payload?;
    let coupon = Coupon::new(req.name.trim().to_string(), req.discount, req.expiration_date);
    coupon.validate()?;

    if !state
        .store
        .insert_unless(&coupon, |c: &Coupon| c.name == coupon.name)
        .await?
    {
        return Err(ApiError::Conflict(format!(
            "Coupon {} already exists",
            coupon.name
        )));
    }
    info!("Created coupon {} ({}% off)", coupon.name, coupon.discount);
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Outcome of a coupon check. An unknown or expired code is a normal
/// answer, not an error.
#[derive(Debug, Serialize)]
pub struct CouponCheck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CouponCheck {
    fn accepted(discount: f64) -> Self {
        Self {
            success: true,
            discount: Some(discount),
            error: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            success: false,
            discount: None,
            error: Some(reason.to_string()),
        }
    }
}

pub async fn validate_coupon(
    State(state): State<AppState>,
    payload: Result<Json<ValidateCouponRequest>, JsonRejection>,
) -> Result<Json<CouponCheck>, ApiError> {
    let Json(req) = payload?;
    let name = req.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Coupon code is required".to_string()));
    }

    let check = match state.store.find_one(|c: &Coupon| c.name == name).await? {
        None => CouponCheck::rejected("Invalid coupon"),
        Some(coupon) if !coupon.is_valid() => CouponCheck::rejected("Coupon expired"),
        Some(coupon) => CouponCheck::accepted(coupon.discount),
    };
    Ok(Json(check))
}

async fn load_coupon(store: &DocumentStore, id: &str) -> Result<Coupon, ApiError> {
    let id = parse_id(id)?;
    store
        .find_by_id::<Coupon>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Coupon {} not found", id)))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Coupon>, ApiError> {
    Ok(Json(load_coupon(&state.store, &id).await?))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CouponRequest>, JsonRejection>,
) -> Result<Json<Coupon>, ApiError> {
    let Json(req) = payload?;
    let id = parse_id(&id)?;
    let name = req.name.trim().to_string();

    let clash = state
        .store
        .find_one(|c: &Coupon| c.name == name && c.id != id)
        .await?;
    if clash.is_some() {
        return Err(ApiError::Conflict(format!("Coupon {} already exists", name)));
    }

    let coupon = state
        .store
        .try_update_one(
            |c: &Coupon| c.id == id,
            |coupon| -> Result<Coupon, ApiError> {
                coupon.name = name;
                coupon.discount = req.discount;
                coupon.expiration_date = req.expiration_date;
                coupon.validate()?;
                Ok(coupon.clone())
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Coupon {} not found", id)))?;
    Ok(Json(coupon))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<Coupon>(&id).await? {
        return Err(ApiError::NotFound(format!("Coupon {} not found", id)));
    }
    info!("Deleted coupon {}", id);
    Ok(Json(MessageResponse::new("Coupon deleted")))
}
