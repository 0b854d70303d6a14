//! Discount coupon model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{CouponId, EntityId};
use crate::validation::{Validate, ValidationErrors, Validator};

/// A named percentage discount, optionally expiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    /// Code typed by the customer
    pub name: String,
    /// Percentage off the subtotal (0-100]
    pub discount: f64,
    /// Last day the coupon can be used (inclusive)
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn new(name: String, discount: f64, expiration_date: Option<NaiveDate>) -> Self {
        Self {
            id: EntityId::random(),
            name,
            discount,
            expiration_date,
            created_at: Utc::now(),
        }
    }

    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.expiration_date.map_or(true, |exp| exp >= date)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_on(Utc::now().date_naive())
    }
}

impl Validate for Coupon {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("name", &self.name).check(
            self.discount.is_finite() && self.discount > 0.0 && self.discount <= 100.0,
            "discount",
            "discount must be greater than 0 and at most 100",
        );
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_expiration_always_valid() {
        let c = Coupon::new("SAQUE10".to_string(), 10.0, None);
        assert!(c.is_valid_on(date(2099, 1, 1)));
    }

    #[test]
    fn test_expiration_inclusive() {
        let c = Coupon::new("BLOCK20".to_string(), 20.0, Some(date(2025, 6, 30)));
        assert!(c.is_valid_on(date(2025, 6, 30)));
        assert!(!c.is_valid_on(date(2025, 7, 1)));
    }

    #[test]
    fn test_discount_bounds() {
        assert!(Coupon::new("A".to_string(), 100.0, None).validate().is_ok());
        assert!(Coupon::new("A".to_string(), 0.0, None).validate().is_err());
        assert!(Coupon::new("A".to_string(), 150.0, None).validate().is_err());
        assert!(Coupon::new(" ".to_string(), 5.0, None)
            .validate()
            .unwrap_err()
            .has_field("name"));
    }
}
