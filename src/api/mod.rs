//! REST API endpoints.
//!
//! Axum-based HTTP API for the league (players, teams, matches) and the
//! shop (items, carts, sales, coupons, users).

pub mod routes;
pub mod state;

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::EntityId;
use crate::storage::StorageError;
use crate::validation::{ValidationErrors, ValidationFailure};

use self::routes::{carts, coupons, health, items, matches, players, sales, teams, users};
use self::state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Duplicate { .. } => ApiError::Conflict(e.to_string()),
            other => {
                tracing::error!("Storage failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::Validation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationFailure>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = self.to_string();
        let details = match self {
            ApiError::Validation(errors) => Some(errors.0),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Parse a client-supplied document id.
pub fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    EntityId::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid ID format: {}", raw)))
}

/// Pagination parameters.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>, default_size: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(default_size).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }

    /// The slice of `items` on this page, plus metadata.
    pub fn apply<T: Clone>(&self, items: &[T]) -> (Vec<T>, PaginationMeta) {
        let meta = PaginationMeta::new(self, items.len() as u32);
        let start = (self.offset() as usize).min(items.len());
        let end = (start + self.page_size as usize).min(items.len());
        (items[start..end].to_vec(), meta)
    }
}

/// Pagination metadata in responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u32) -> Self {
        let total_pages = total_items.div_ceil(pagination.page_size);
        Self {
            page: pagination.page,
            page_size: pagination.page_size,
            total_items,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        "*" => layer.allow_origin(Any),
        other => match HeaderValue::from_str(other) {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                tracing::warn!("Invalid CORS origin {:?}, allowing any", other);
                layer.allow_origin(Any)
            }
        },
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(health::health))
        // Players
        .route("/player", get(players::list_players).post(players::create_player))
        .route(
            "/player/:id",
            get(players::get_player)
                .put(players::update_player)
                .delete(players::delete_player),
        )
        .route("/player/:id/stats", get(players::player_stats))
        .route("/player/:id/teams", get(players::player_teams))
        // Teams
        .route("/team", get(teams::list_teams).post(teams::create_team))
        .route(
            "/team/:id",
            get(teams::get_team)
                .put(teams::update_team)
                .delete(teams::delete_team),
        )
        .route(
            "/team/:id/players",
            get(teams::team_players).post(teams::add_player_to_team),
        )
        .route(
            "/team/:id/players/:player_id",
            delete(teams::remove_player_from_team),
        )
        // Matches
        .route("/match", get(matches::list_matches).post(matches::create_match))
        .route(
            "/match/:id",
            get(matches::get_match)
                .put(matches::update_match)
                .delete(matches::delete_match),
        )
        // Items
        .route("/item", get(items::list_items).post(items::create_item))
        .route(
            "/item/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        // Carts
        .route("/cart/all", get(carts::list_carts))
        .route("/cart", post(carts::create_cart))
        .route(
            "/cart/:user_id",
            get(carts::get_cart).delete(carts::delete_cart),
        )
        .route(
            "/cart/:user_id/item",
            post(carts::add_item)
                .put(carts::update_item)
                .delete(carts::remove_item),
        )
        .route("/cart/:user_id/clear", delete(carts::clear_cart))
        .route("/cart/:user_id/summary", get(carts::cart_summary))
        .route("/cart/:user_id/coupon", post(carts::apply_coupon))
        // Sales
        .route("/sale", get(sales::list_sales).post(sales::create_sale))
        .route("/sale/from-cart", post(sales::create_sale_from_cart))
        .route("/sale/statistics", get(sales::sales_statistics))
        .route("/sale/user/:user_id", get(sales::user_sales))
        .route(
            "/sale/:id",
            get(sales::get_sale).delete(sales::delete_sale),
        )
        .route("/sale/:id/status", put(sales::update_status))
        .route("/sale/:id/cancel", put(sales::cancel_sale))
        .route("/sale/:id/notes", put(sales::update_notes))
        // Coupons
        .route("/cupom", get(coupons::list_coupons).post(coupons::create_coupon))
        .route("/cupom/validate", post(coupons::validate_coupon))
        .route(
            "/cupom/:id",
            get(coupons::get_coupon)
                .put(coupons::update_coupon)
                .delete(coupons::delete_coupon),
        )
        // Users
        .route("/user", get(users::list_users).post(users::create_user))
        .route(
            "/user/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 10);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_new() {
        let p = Pagination::new(Some(3), Some(25), 10);
        assert_eq!(p.page, 3);
        assert_eq!(p.page_size, 25);
        assert_eq!(p.offset(), 50);

        let p = Pagination::new(None, None, 20);
        assert_eq!(p.page_size, 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(Some(0), Some(50), 10);
        assert_eq!(p.page, 1);

        let p = Pagination::new(Some(1), Some(200), 10);
        assert_eq!(p.page_size, 100);
    }

    #[test]
    fn test_pagination_apply() {
        let items: Vec<u32> = (1..=25).collect();
        let (page, meta) = Pagination::new(Some(3), Some(10), 10).apply(&items);
        assert_eq!(page, vec![21, 22, 23, 24, 25]);
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next);
        assert!(meta.has_prev);

        let (page, _) = Pagination::new(Some(9), Some(10), 10).apply(&items);
        assert!(page.is_empty());
    }

    #[test]
    fn test_pagination_meta() {
        let p = Pagination::new(Some(2), Some(10), 10);
        let meta = PaginationMeta::new(&p, 25);

        assert_eq!(meta.page, 2);
        assert_eq!(meta.total_items, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_parse_id() {
        let id = EntityId::random();
        assert_eq!(parse_id(id.as_str()).unwrap(), id);
        assert!(matches!(parse_id("123"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_validation_error_status() {
        let err = ApiError::from(ValidationErrors::single("name", "too short"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = ApiError::from(StorageError::Duplicate {
            collection: crate::storage::Collection::Users,
            id: "x".to_string(),
        });
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
