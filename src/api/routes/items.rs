use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{contains_ci, MessageResponse};
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError, Pagination, PaginationMeta};
use crate::models::{Gender, Item, ItemKind, ItemVariation};
use crate::validation::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<Item>,
    pub pagination: PaginationMeta,
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<ItemListResponse>, ApiError> {
    let kind = params.kind.as_deref().map(|k| k.trim().to_lowercase());

    let mut items: Vec<Item> = state
        .store
        .find_where(|i: &Item| {
            params.name.as_deref().map_or(true, |n| contains_ci(&i.name, n))
                && kind.as_deref().map_or(true, |k| i.kind.type_name() == k)
                && params.price_min.map_or(true, |min| i.price >= min)
                && params.price_max.map_or(true, |max| i.price <= max)
        })
        .await?;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let pagination = Pagination::new(
        params.page,
        params.page_size,
        state.config.shop.default_page_size,
    );
    let (items, pagination) = pagination.apply(&items);

    Ok(Json(ItemListResponse { items, pagination }))
}

/// Full item body, used for both create and replace.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub brand: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub variations: Vec<ItemVariation>,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl ItemRequest {
    fn into_item(self) -> Item {
        let mut item = Item::new(
            self.name.trim().to_string(),
            self.price,
            self.brand.trim().to_string(),
            self.kind,
        );
        item.description = self.description;
        item.image = self.image;
        item.gender = self.gender;
        for variation in self.variations {
            item.add_variation(variation);
        }
        item
    }
}

pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let Json(req) = payload?;
    let item = req.into_item();
    item.validate()?;

    state.store.insert(&item).await?;
    info!(
        "Added {} item {} ({})",
        item.kind.type_name(),
        item.name,
        item.id
    );
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let id = parse_id(&id)?;
    let item = state
        .store
        .find_by_id::<Item>(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {} not found", id)))?;
    Ok(Json(item))
}

/// Replace an item's contents, keeping its id and creation time.
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> Result<Json<Item>, ApiError> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;

    let item = state
        .store
        .try_update_one(
            |i: &Item| i.id == id,
            |stored| -> Result<Item, ApiError> {
                let mut item = req.into_item();
                item.id = stored.id.clone();
                item.created_at = stored.created_at;
                item.validate()?;
                *stored = item.clone();
                Ok(item)
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {} not found", id)))?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete::<Item>(&id).await? {
        return Err(ApiError::NotFound(format!("Item {} not found", id)));
    }
    info!("Deleted item {}", id);
    Ok(Json(MessageResponse::new("Item deleted")))
}
