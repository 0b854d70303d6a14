//! Route handlers, one module per resource.

pub mod carts;
pub mod coupons;
pub mod health;
pub mod items;
pub mod matches;
pub mod players;
pub mod sales;
pub mod teams;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::ApiError;
use crate::models::EntityId;

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Re-check an id that arrived inside a request body.
pub(crate) fn body_id(field: &str, id: &EntityId) -> Result<EntityId, ApiError> {
    EntityId::parse(id.as_str())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {}: {}", field, id)))
}

/// For optional fields where an explicit `null` means "clear it".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Case-insensitive substring match.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.trim().to_lowercase())
}
