use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{body_id, MessageResponse};
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError};
use crate::calculate::SalesStatistics;
use crate::models::{
    Cart, Coupon, DeliveryAddress, Item, ItemId, PaymentMethod, Sale, SaleItem, SaleStatus,
    UserId,
};
use crate::storage::DocumentStore;
use crate::validation::Validate;

/// A sale after a mutation.
#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub message: String,
    pub sale: Sale,
}

impl SaleResponse {
    fn new(message: &str, sale: Sale) -> Self {
        Self {
            message: message.to_string(),
            sale,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSalesParams {
    pub user_id: Option<String>,
    pub status: Option<SaleStatus>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Parse a date filter. Accepts RFC 3339 timestamps or plain dates; a plain
/// date covers the whole day.
fn parse_date_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {}", raw)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .unwrap_or_default();
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

fn newest_first(sales: &mut [Sale]) {
    sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<ListSalesParams>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    let user_id = params.user_id.as_deref().map(parse_id).transpose()?;
    let start = params
        .start_date
        .as_deref()
        .map(|d| parse_date_bound(d, false))
        .transpose()?;
    let end = params
        .end_date
        .as_deref()
        .map(|d| parse_date_bound(d, true))
        .transpose()?;

    let mut sales: Vec<Sale> = state
        .store
        .find_where(|s: &Sale| {
            user_id.as_ref().map_or(true, |u| &s.user_id == u)
                && params.status.map_or(true, |st| s.status == st)
                && start.map_or(true, |from| s.created_at >= from)
                && end.map_or(true, |to| s.created_at <= to)
        })
        .await?;
    newest_first(&mut sales);
    Ok(Json(sales))
}

/// A requested line; name and price come from the catalogue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub item_id: ItemId,
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_size: Option<String>,
}

/// Price each requested line from the catalogue. Unknown items are a 404.
async fn price_lines(
    store: &DocumentStore,
    lines: Vec<SaleLineRequest>,
) -> Result<Vec<SaleItem>, ApiError> {
    let catalogue: Vec<Item> = store
        .find_where(|i: &Item| lines.iter().any(|l| l.item_id == i.id))
        .await?;

    lines
        .into_iter()
        .map(|line| {
            let item = catalogue
                .iter()
                .find(|i| i.id == line.item_id)
                .ok_or_else(|| ApiError::NotFound(format!("Item {} not found", line.item_id)))?;
            Ok(SaleItem {
                item_id: item.id.clone(),
                item_name: item.name.clone(),
                quantity: line.quantity,
                unit_price: item.price,
                selected_color: line.selected_color,
                selected_size: line.selected_size,
                image: item.image.clone(),
            })
        })
        .collect()
}

/// Discount for a coupon code, which must exist and be unexpired.
async fn coupon_discount(store: &DocumentStore, code: &str) -> Result<f64, ApiError> {
    let coupon = store
        .find_one(|c: &Coupon| c.name == code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Coupon {} not found", code)))?;
    if !coupon.is_valid() {
        return Err(ApiError::BadRequest(format!("Coupon {} has expired", code)));
    }
    Ok(coupon.discount)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub user_id: UserId,
    pub items: Vec<SaleLineRequest>,
    pub payment_method: PaymentMethod,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Record a sale. Prices and totals are computed here; client-side totals
/// are never trusted.
pub async fn create_sale(
    State(state): State<AppState>,
    payload: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let Json(req) = payload?;
    let user_id = body_id("userId", &req.user_id)?;

    let items = price_lines(&state.store, req.items).await?;
    let coupon_code = req
        .coupon_code
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let discount = match coupon_code.as_deref() {
        Some(code) => coupon_discount(&state.store, code).await?,
        None => 0.0,
    };

    let mut sale = Sale::new(
        user_id,
        items,
        discount,
        coupon_code,
        req.payment_method,
        req.delivery_address,
    );
    sale.notes = req.notes;
    sale.validate()?;

    state.store.insert(&sale).await?;
    info!(
        "Recorded sale {} for user {}: total {:.2}",
        sale.id, sale.user_id, sale.total
    );
    Ok((StatusCode::CREATED, Json(SaleResponse::new("Sale created", sale))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFromCartRequest {
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Check out the user's cart: record a sale at catalogue prices with the
/// cart's discount, then empty the cart.
pub async fn create_sale_from_cart(
    State(state): State<AppState>,
    payload: Result<Json<SaleFromCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let Json(req) = payload?;
    let user_id = body_id("userId", &req.user_id)?;

    let cart = state
        .store
        .find_one(|c: &Cart| c.user_id == user_id)
        .await?
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Cart is empty or missing".to_string()))?;

    let lines = cart
        .items
        .iter()
        .map(|l| SaleLineRequest {
            item_id: l.item_id.clone(),
            quantity: l.quantity,
            selected_color: l.selected_color.clone(),
            selected_size: l.selected_size.clone(),
        })
        .collect();
    let items = price_lines(&state.store, lines).await?;

    let mut sale = Sale::new(
        user_id,
        items,
        cart.discount,
        cart.coupon_code.clone(),
        req.payment_method,
        req.delivery_address,
    );
    sale.notes = req.notes;
    sale.validate()?;

    state.store.insert(&sale).await?;
    if state
        .store
        .update::<Cart, _>(&cart.id, |c| c.clear())
        .await?
        .is_none()
    {
        warn!("Cart {} vanished during checkout of sale {}", cart.id, sale.id);
    }

    info!(
        "Checked out cart {} into sale {}: total {:.2}",
        cart.id, sale.id, sale.total
    );
    Ok((StatusCode::CREATED, Json(SaleResponse::new("Sale created", sale))))
}

pub async fn sales_statistics(
    State(state): State<AppState>,
) -> Result<Json<SalesStatistics>, ApiError> {
    let sales = state.store.find_all::<Sale>().await?;
    Ok(Json(SalesStatistics::from_sales(
        &sales,
        state.config.shop.recent_sales_limit,
    )))
}

pub async fn user_sales(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let mut sales: Vec<Sale> = state
        .store
        .find_where(|s: &Sale| s.user_id == user_id)
        .await?;
    newest_first(&mut sales);
    Ok(Json(sales))
}

async fn load_sale(store: &DocumentStore, id: &str) -> Result<Sale, ApiError> {
    let id = parse_id(id)?;
    store
        .find_by_id::<Sale>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sale {} not found", id)))
}

/// Change a sale under the store's write lock. Nothing is saved when `f`
/// fails.
async fn update_sale<F>(store: &DocumentStore, id: &str, f: F) -> Result<Sale, ApiError>
where
    F: FnOnce(&mut Sale) -> Result<(), ApiError>,
{
    let id = parse_id(id)?;
    store
        .try_update_one(
            |s: &Sale| s.id == id,
            |sale| -> Result<Sale, ApiError> {
                f(sale)?;
                Ok(sale.clone())
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sale {} not found", id)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sale>, ApiError> {
    Ok(Json(load_sale(&state.store, &id).await?))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<Sale>(&id).await? {
        return Err(ApiError::NotFound(format!("Sale {} not found", id)));
    }
    info!("Deleted sale {}", id);
    Ok(Json(MessageResponse::new("Sale deleted")))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SaleStatus,
}

fn status_message(status: SaleStatus) -> &'static str {
    match status {
        SaleStatus::Pending => "Sale updated",
        SaleStatus::Confirmed => "Sale confirmed",
        SaleStatus::Shipped => "Sale shipped",
        SaleStatus::Delivered => "Sale delivered",
        SaleStatus::Cancelled => "Sale cancelled",
    }
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<SaleResponse>, ApiError> {
    let Json(req) = payload?;
    let sale = update_sale(&state.store, &id, |sale| {
        sale.set_status(req.status);
        Ok(())
    })
    .await?;
    info!("Sale {} is now {}", sale.id, sale.status.as_str());

    Ok(Json(SaleResponse::new(status_message(req.status), sale)))
}

pub async fn cancel_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale = update_sale(&state.store, &id, |sale| {
        if sale.cancel() {
            Ok(())
        } else {
            Err(ApiError::BadRequest(format!(
                "Sale {} is {} and can no longer be cancelled",
                sale.id,
                sale.status.as_str()
            )))
        }
    })
    .await?;
    info!("Cancelled sale {}", sale.id);

    Ok(Json(SaleResponse::new("Sale cancelled", sale)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn update_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNotesRequest>, JsonRejection>,
) -> Result<Json<SaleResponse>, ApiError> {
    let Json(req) = payload?;
    let sale = update_sale(&state.store, &id, |sale| {
        sale.set_notes(req.notes.filter(|n| !n.trim().is_empty()));
        Ok(())
    })
    .await?;

    Ok(Json(SaleResponse::new("Sale notes updated", sale)))
}
