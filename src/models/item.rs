//! Shop catalogue items.
//!
//! The item subtypes share one record shape plus a small set of
//! type-specific attributes, carried by [`ItemKind`] and tagged on the wire
//! by the `type` field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{EntityId, ItemId};
use crate::validation::{Validate, ValidationErrors, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
    Unisex,
    Kids,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClothingCategory {
    Shirt,
    Pants,
    Shorts,
    Jacket,
    Accessories,
}

/// Type-specific attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Ball {
        #[serde(default)]
        quantity: u32,
        #[serde(default)]
        sport: Option<String>,
        /// Weight in grams
        #[serde(default)]
        weight: Option<f64>,
    },
    Shoes,
    Clothes {
        category: ClothingCategory,
        #[serde(default)]
        material: Option<String>,
    },
    Accessories,
}

impl ItemKind {
    /// The `type` tag value.
    pub fn type_name(&self) -> &'static str {
        match self {
            ItemKind::Ball { .. } => "ball",
            ItemKind::Shoes => "shoes",
            ItemKind::Clothes { .. } => "clothes",
            ItemKind::Accessories => "accessories",
        }
    }
}

/// A color/size combination with its own stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVariation {
    /// Color code, e.g. "#FF0000"
    pub color: String,
    pub color_name: String,
    pub size: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
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
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: String, price: f64, brand: String, kind: ItemKind) -> Self {
        Self {
            id: EntityId::random(),
            name,
            description: None,
            price,
            brand,
            image: None,
            gender: None,
            variations: Vec::new(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// Units in stock across all variations.
    ///
    /// Balls without variations track stock in their own `quantity`.
    pub fn total_stock(&self) -> u32 {
        match (&self.kind, self.variations.is_empty()) {
            (ItemKind::Ball { quantity, .. }, true) => *quantity,
            _ => self.variations.iter().map(|v| v.quantity).sum(),
        }
    }

    pub fn is_in_stock(&self) -> bool {
        self.total_stock() > 0
    }

    pub fn available_colors(&self) -> Vec<String> {
        unique_sorted(self.variations.iter().map(|v| v.color.clone()))
    }

    pub fn available_sizes(&self) -> Vec<String> {
        unique_sorted(self.variations.iter().map(|v| v.size.clone()))
    }

    pub fn find_variation(&self, color: &str, size: &str) -> Option<&ItemVariation> {
        self.variations
            .iter()
            .find(|v| v.color == color && v.size == size)
    }

    /// Add a variation, merging stock into an existing color/size pair.
    pub fn add_variation(&mut self, variation: ItemVariation) {
        match self
            .variations
            .iter_mut()
            .find(|v| v.color == variation.color && v.size == variation.size)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(variation.quantity),
            None => self.variations.push(variation),
        }
    }

    pub fn remove_variation(&mut self, color: &str, size: &str) -> bool {
        let before = self.variations.len();
        self.variations.retain(|v| !(v.color == color && v.size == size));
        self.variations.len() < before
    }
}

fn unique_sorted(values: impl Iterator<Item = String>) -> Vec<String> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

impl Validate for Item {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut v = Validator::new();
        v.non_empty("name", &self.name)
            .non_empty("brand", &self.brand)
            .at_least("price", self.price, 0.0);

        for (i, variation) in self.variations.iter().enumerate() {
            let mut inner = Validator::new();
            inner
                .non_empty("color", &variation.color)
                .non_empty("size", &variation.size);
            v.nested(&format!("variations[{}]", i), inner.finish());
        }

        if let ItemKind::Ball {
            weight: Some(weight),
            ..
        } = &self.kind
        {
            v.at_least("weight", *weight, 0.0);
        }
        v.finish()
    }
}
