use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{body_id, MessageResponse};
use crate::api::state::AppState;
use crate::api::{parse_id, ApiError};
use crate::calculate::{line_total, OrderTotals};
use crate::models::{Cart, CartItem, Coupon, Item, ItemId, UserId};
use crate::storage::DocumentStore;
use crate::validation::Validate;

/// A cart after a mutation.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub message: String,
    pub cart: Cart,
}

impl CartResponse {
    fn new(message: &str, cart: Cart) -> Self {
        Self {
            message: message.to_string(),
            cart,
        }
    }
}

async fn find_cart(store: &DocumentStore, user_id: &UserId) -> Result<Option<Cart>, ApiError> {
    Ok(store.find_one(|c: &Cart| &c.user_id == user_id).await?)
}

async fn load_cart(store: &DocumentStore, user_id: &UserId) -> Result<Cart, ApiError> {
    find_cart(store, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart for user {} not found", user_id)))
}

/// The user's cart, created empty on first access.
async fn load_or_create_cart(store: &DocumentStore, user_id: &UserId) -> Result<Cart, ApiError> {
    if let Some(cart) = find_cart(store, user_id).await? {
        return Ok(cart);
    }
    let cart = Cart::new(user_id.clone());
    if store
        .insert_unless(&cart, |c: &Cart| &c.user_id == user_id)
        .await?
    {
        info!("Created cart {} for user {}", cart.id, user_id);
        return Ok(cart);
    }
    // Lost a race with another request creating the same cart.
    load_cart(store, user_id).await
}

/// Change the user's cart under the store's write lock. Nothing is saved
/// when `f` or validation fails.
async fn update_cart<F>(store: &DocumentStore, user_id: &UserId, f: F) -> Result<Cart, ApiError>
where
    F: FnOnce(&mut Cart) -> Result<(), ApiError>,
{
    store
        .try_update_one(
            |c: &Cart| &c.user_id == user_id,
            |cart| -> Result<Cart, ApiError> {
                f(cart)?;
                cart.validate()?;
                Ok(cart.clone())
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart for user {} not found", user_id)))
}

pub async fn list_carts(State(state): State<AppState>) -> Result<Json<Vec<Cart>>, ApiError> {
    Ok(Json(state.store.find_all::<Cart>().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

pub async fn create_cart(
    State(state): State<AppState>,
    payload: Result<Json<CreateCartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Cart>), ApiError> {
    let Json(req) = payload?;
    let user_id = body_id("userId", &req.user_id)?;

    let mut cart = Cart::new(user_id.clone());
    for line in req.items {
        cart.add_item(line);
    }
    cart.validate()?;

    if !state
        .store
        .insert_unless(&cart, |c: &Cart| c.user_id == user_id)
        .await?
    {
        return Err(ApiError::Conflict(format!(
            "Cart already exists for user {}",
            user_id
        )));
    }
    info!("Created cart {} for user {}", cart.id, user_id);
    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let user_id = parse_id(&user_id)?;
    Ok(Json(load_or_create_cart(&state.store, &user_id).await?))
}

pub async fn delete_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let removed = state
        .store
        .delete_where(|c: &Cart| c.user_id == user_id)
        .await?;
    if removed == 0 {
        return Err(ApiError::NotFound(format!(
            "Cart for user {} not found",
            user_id
        )));
    }
    info!("Deleted cart for user {}", user_id);
    Ok(Json(MessageResponse::new("Cart deleted")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    pub item_id: ItemId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_size: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<AddCartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let Json(req) = payload?;
    let item_id = body_id("itemId", &req.item_id)?;

    let line = CartItem {
        item_id,
        quantity: req.quantity,
        selected_color: req.selected_color,
        selected_size: req.selected_size,
    };
    line.validate()?;

    if !state.store.exists::<Item>(&line.item_id).await? {
        return Err(ApiError::NotFound(format!("Item {} not found", line.item_id)));
    }

    load_or_create_cart(&state.store, &user_id).await?;
    let cart = update_cart(&state.store, &user_id, |cart| {
        cart.add_item(line);
        Ok(())
    })
    .await?;

    Ok(Json(CartResponse::new("Item added to cart", cart)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemRequest {
    pub item_id: ItemId,
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_size: Option<String>,
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdateCartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let Json(req) = payload?;
    if req.quantity < 1 {
        return Err(ApiError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    let cart = update_cart(&state.store, &user_id, |cart| {
        if cart.update_quantity(
            &req.item_id,
            req.selected_color.as_deref(),
            req.selected_size.as_deref(),
            req.quantity,
        ) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!(
                "Item {} not found in cart",
                req.item_id
            )))
        }
    })
    .await?;

    Ok(Json(CartResponse::new("Cart updated", cart)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartItemRequest {
    pub item_id: ItemId,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_size: Option<String>,
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<RemoveCartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let Json(req) = payload?;

    let cart = update_cart(&state.store, &user_id, |cart| {
        if cart.remove_item(
            &req.item_id,
            req.selected_color.as_deref(),
            req.selected_size.as_deref(),
        ) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!(
                "Item {} not found in cart",
                req.item_id
            )))
        }
    })
    .await?;

    Ok(Json(CartResponse::new("Item removed from cart", cart)))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let cart = update_cart(&state.store, &user_id, |cart| {
        cart.clear();
        Ok(())
    })
    .await?;
    info!("Cleared cart for user {}", user_id);
    Ok(Json(CartResponse::new("Cart cleared", cart)))
}

/// One cart line priced from the catalogue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedCartLine {
    #[serde(flatten)]
    pub line: CartItem,
    /// None when the item has since left the catalogue
    pub item_name: Option<String>,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub item_count: u32,
    pub is_empty: bool,
    pub items: Vec<PricedCartLine>,
    pub coupon_code: Option<String>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

pub async fn cart_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CartSummary>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let cart = load_cart(&state.store, &user_id).await?;

    let catalogue: Vec<Item> = state
        .store
        .find_where(|i: &Item| cart.items.iter().any(|l| l.item_id == i.id))
        .await?;

    let items: Vec<PricedCartLine> = cart
        .items
        .iter()
        .map(|line| {
            let item = catalogue.iter().find(|i| i.id == line.item_id);
            let unit_price = item.map_or(0.0, |i| i.price);
            PricedCartLine {
                line: line.clone(),
                item_name: item.map(|i| i.name.clone()),
                unit_price,
                line_total: line_total(unit_price, line.quantity),
            }
        })
        .collect();

    let totals = OrderTotals::compute(
        items.iter().map(|l| (l.unit_price, l.line.quantity)),
        cart.discount,
    );

    Ok(Json(CartSummary {
        item_count: cart.item_count(),
        is_empty: cart.is_empty(),
        items,
        coupon_code: cart.coupon_code.clone(),
        totals,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub name: String,
}

/// Attach a coupon's discount to the cart. Expired or unknown coupons are
/// rejected.
pub async fn apply_coupon(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<ApplyCouponRequest>, JsonRejection>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = parse_id(&user_id)?;
    let Json(req) = payload?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Coupon name is required".to_string()));
    }

    let coupon = state
        .store
        .find_one(|c: &Coupon| c.name == name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Coupon {} not found", name)))?;
    if !coupon.is_valid() {
        return Err(ApiError::BadRequest(format!("Coupon {} has expired", name)));
    }

    let cart = update_cart(&state.store, &user_id, |cart| {
        cart.apply_coupon(coupon.name, coupon.discount);
        Ok(())
    })
    .await?;
    info!("Applied coupon {:?} to cart for user {}", cart.coupon_code, user_id);

    Ok(Json(CartResponse::new("Coupon applied", cart)))
}
