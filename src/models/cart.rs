//! Shopping cart model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartId, EntityId, ItemId, UserId};
use crate::validation::{Validate, ValidationErrors, Validator};

/// One line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub item_id: ItemId,
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_size: Option<String>,
}

impl CartItem {
    /// Same catalogue item in the same color and size.
    pub fn same_line(&self, item_id: &ItemId, color: Option<&str>, size: Option<&str>) -> bool {
        &self.item_id == item_id
            && self.selected_color.as_deref() == color
            && self.selected_size.as_deref() == size
    }
}

impl Validate for CartItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("itemId", self.item_id.as_str())
            .check(self.quantity >= 1, "quantity", "quantity must be at least 1");
        v.finish()
    }
}

/// A user's cart. Each user has at most one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Percentage discount from the applied coupon
    #[serde(default)]
    pub discount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::random(),
            user_id,
            items: Vec::new(),
            coupon_code: None,
            discount: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a line, merging quantities into an identical item/color/size line.
    pub fn add_item(&mut self, line: CartItem) {
        let color = line.selected_color.as_deref();
        let size = line.selected_size.as_deref();
        match self
            .items
            .iter_mut()
            .find(|i| i.same_line(&line.item_id, color, size))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.items.push(line),
        }
        self.touch();
    }

    /// Remove a line. Returns false if nothing matched.
    pub fn remove_item(
        &mut self,
        item_id: &ItemId,
        color: Option<&str>,
        size: Option<&str>,
    ) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !i.same_line(item_id, color, size));
        let removed = self.items.len() < before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Set the quantity of an existing line. Returns false if nothing matched.
    pub fn update_quantity(
        &mut self,
        item_id: &ItemId,
        color: Option<&str>,
        size: Option<&str>,
        quantity: u32,
    ) -> bool {
        let Some(line) = self
            .items
            .iter_mut()
            .find(|i| i.same_line(item_id, color, size))
        else {
            return false;
        };
        line.quantity = quantity;
        self.touch();
        true
    }

    pub fn find_item(
        &self,
        item_id: &ItemId,
        color: Option<&str>,
        size: Option<&str>,
    ) -> Option<&CartItem> {
        self.items.iter().find(|i| i.same_line(item_id, color, size))
    }

    /// Empty the cart and drop any applied coupon.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon_code = None;
        self.discount = 0.0;
        self.touch();
    }

    pub fn apply_coupon(&mut self, code: String, discount: f64) {
        self.coupon_code = Some(code);
        self.discount = discount;
        self.touch();
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Validate for Cart {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("userId", self.user_id.as_str())
            .range("discount", self.discount, 0.0, 100.0);
        for (i, line) in self.items.iter().enumerate() {
            v.nested(&format!("items[{}]", i), line.validate());
        }
        v.finish()
    }
}
