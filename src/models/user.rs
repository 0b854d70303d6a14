//! Shop user model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, UserId};
use crate::validation::{is_valid_email, Validate, ValidationErrors, Validator};

/// A shop customer or league staff member.
///
/// Credentials are not stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String) -> Self {
        Self {
            id: EntityId::random(),
            email: normalize_email(&email),
            name,
            created_at: Utc::now(),
        }
    }
}

/// E-mail addresses compare case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.check(is_valid_email(&self.email), "email", "email must be a valid address")
            .length("name", self.name.trim(), 2, 100);
        v.finish()
    }
}
