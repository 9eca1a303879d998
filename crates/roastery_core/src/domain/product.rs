//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::localized::LocalizedText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Product {
    pub id: Uuid,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub origin: String,
    pub category: String,
    pub price: Decimal,
    pub weight_grams: Option<u32>,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn from_new(id: Uuid, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            origin: new.origin,
            category: new.category,
            price: new.price,
            weight_grams: new.weight_grams,
            image_url: new.image_url,
            in_stock: new.in_stock,
            featured: new.featured,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: &ProductPatch, now: DateTime<Utc>) {
        if let Some(v) = &patch.name {
            self.name = v.clone();
        }
        if let Some(v) = &patch.description {
            self.description = v.clone();
        }
        if let Some(v) = &patch.origin {
            self.origin = v.clone();
        }
        if let Some(v) = &patch.category {
            self.category = v.clone();
        }
        if let Some(v) = patch.price {
            self.price = v;
        }
        if let Some(v) = patch.weight_grams {
            self.weight_grams = Some(v);
        }
        if let Some(v) = &patch.image_url {
            self.image_url = Some(v.clone());
        }
        if let Some(v) = patch.in_stock {
            self.in_stock = v;
        }
        if let Some(v) = patch.featured {
            self.featured = v;
        }
        self.updated_at = now;
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewProduct {
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub weight_grams: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct ProductPatch {
    pub name: Option<LocalizedText>,
    pub description: Option<LocalizedText>,
    pub origin: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub weight_grams: Option<u32>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    /// Matches the name in either language.
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn accepts(&self, product: &Product) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| product.category.eq_ignore_ascii_case(c))
            && self.in_stock.map_or(true, |s| product.in_stock == s)
            && self.featured.map_or(true, |f| product.featured == f)
            && self
                .search
                .as_deref()
                .map_or(true, |needle| product.name.matches(needle))
    }
}
