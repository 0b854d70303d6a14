//! Sale (order) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EntityId, ItemId, SaleId, UserId};
use crate::calculate::OrderTotals;
use crate::validation::{Validate, ValidationErrors, Validator};

/// Order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Confirmed => "confirmed",
            SaleStatus::Shipped => "shipped",
            SaleStatus::Delivered => "delivered",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Pix,
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Cash => "CASH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl Validate for DeliveryAddress {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("street", &self.street)
            .non_empty("number", &self.number)
            .non_empty("neighborhood", &self.neighborhood)
            .non_empty("city", &self.city)
            .non_empty("state", &self.state)
            .non_empty("zipCode", &self.zip_code);
        v.finish()
    }
}

/// A purchased line, priced at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl SaleItem {
    pub fn line_total(&self) -> f64 {
        crate::calculate::line_total(self.unit_price, self.quantity)
    }
}

impl Validate for SaleItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("itemId", self.item_id.as_str())
            .check(self.quantity >= 1, "quantity", "quantity must be at least 1")
            .at_least("unitPrice", self.unit_price, 0.0);
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: SaleId,
    pub user_id: UserId,
    pub items: Vec<SaleItem>,
    pub subtotal: f64,
    /// Percentage discount applied to the subtotal
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub total: f64,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub delivery_address: DeliveryAddress,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// New pending sale with totals computed from the lines.
    pub fn new(
        user_id: UserId,
        items: Vec<SaleItem>,
        discount: f64,
        coupon_code: Option<String>,
        payment_method: PaymentMethod,
        delivery_address: DeliveryAddress,
    ) -> Self {
        let now = Utc::now();
        let mut sale = Self {
            id: EntityId::random(),
            user_id,
            items,
            subtotal: 0.0,
            discount,
            coupon_code,
            total: 0.0,
            status: SaleStatus::Pending,
            payment_method,
            delivery_address,
            notes: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
        };
        sale.recalculate();
        sale
    }

    pub fn totals(&self) -> OrderTotals {
        OrderTotals::compute(
            self.items.iter().map(|i| (i.unit_price, i.quantity)),
            self.discount,
        )
    }

    /// Recompute subtotal and total from the lines and discount.
    pub fn recalculate(&mut self) {
        let totals = self.totals();
        self.subtotal = totals.subtotal;
        self.total = totals.total;
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, SaleStatus::Pending | SaleStatus::Confirmed)
    }

    /// Move to `status`. Delivery stamps `delivered_at`.
    pub fn set_status(&mut self, status: SaleStatus) {
        let now = Utc::now();
        if status == SaleStatus::Delivered {
            self.delivered_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }

    /// Cancel if still allowed. Returns false when the sale has moved past
    /// confirmation.
    pub fn cancel(&mut self) -> bool {
        if !self.can_be_cancelled() {
            return false;
        }
        self.set_status(SaleStatus::Cancelled);
        true
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
        self.updated_at = Utc::now();
    }
}

impl Validate for Sale {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("userId", self.user_id.as_str())
            .check(!self.items.is_empty(), "items", "a sale needs at least one item")
            .range("discount", self.discount, 0.0, 100.0);
        for (i, item) in self.items.iter().enumerate() {
            v.nested(&format!("items[{}]", i), item.validate());
        }
        v.nested("deliveryAddress", self.delivery_address.validate());
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            street: "Av. Paulista".to_string(),
            number: "1000".to_string(),
            complement: None,
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            zip_code: "01310-100".to_string(),
        }
    }

    fn item(price: f64, qty: u32) -> SaleItem {
        SaleItem {
            item_id: EntityId::from("i1"),
            item_name: "Ball".to_string(),
            quantity: qty,
            unit_price: price,
            selected_color: None,
            selected_size: None,
            image: None,
        }
    }

    fn sale(discount: f64) -> Sale {
        Sale::new(
            EntityId::from("u1"),
            vec![item(100.0, 2), item(50.0, 1)],
            discount,
            None,
            PaymentMethod::Pix,
            address(),
        )
    }

    #[test]
    fn test_new_sale_totals() {
        let s = sale(10.0);
        assert_eq!(s.subtotal, 250.0);
        assert_eq!(s.total, 225.0);
        assert_eq!(s.status, SaleStatus::Pending);
    }

    #[test]
    fn test_cancel_only_before_shipping() {
        let mut s = sale(0.0);
        s.set_status(SaleStatus::Confirmed);
        assert!(s.cancel());
        assert_eq!(s.status, SaleStatus::Cancelled);

        let mut s = sale(0.0);
        s.set_status(SaleStatus::Shipped);
        assert!(!s.cancel());
        assert_eq!(s.status, SaleStatus::Shipped);
    }

    #[test]
    fn test_delivered_sets_timestamp() {
        let mut s = sale(0.0);
        assert!(s.delivered_at.is_none());
        s.set_status(SaleStatus::Delivered);
        assert!(s.delivered_at.is_some());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(sale(0.0)).unwrap();
        assert_eq!(json["paymentMethod"], "PIX");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["deliveryAddress"]["zipCode"], "01310-100");
        let m: PaymentMethod = serde_json::from_str("\"BANK_TRANSFER\"").unwrap();
        assert_eq!(m, PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_validation() {
        let mut s = sale(0.0);
        assert!(s.validate().is_ok());

        s.items.clear();
        s.discount = 120.0;
        s.delivery_address.city = String::new();
        let errors = s.validate().unwrap_err();
        assert!(errors.has_field("items"));
        assert!(errors.has_field("discount"));
        assert!(errors.has_field("deliveryAddress.city"));
    }
}
