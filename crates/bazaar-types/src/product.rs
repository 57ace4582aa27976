//! Marketplace listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{ProductId, UserId};
use crate::record::Record;
use crate::Timestamp;

/// Physical condition of a listed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TypeError::UnknownVariant {
                kind: "condition",
                value: s.to_string(),
            })
    }
}

/// Listing category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Fashion,
    Furniture,
    Household,
    Vehicles,
    Property,
    Collectibles,
    Sports,
    Toys,
    #[serde(rename = "Business & Industrial")]
    BusinessIndustrial,
    Jewelry,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Electronics,
        Category::Fashion,
        Category::Furniture,
        Category::Household,
        Category::Vehicles,
        Category::Property,
        Category::Collectibles,
        Category::Sports,
        Category::Toys,
        Category::BusinessIndustrial,
        Category::Jewelry,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Fashion => "Fashion",
            Category::Furniture => "Furniture",
            Category::Household => "Household",
            Category::Vehicles => "Vehicles",
            Category::Property => "Property",
            Category::Collectibles => "Collectibles",
            Category::Sports => "Sports",
            Category::Toys => "Toys",
            Category::BusinessIndustrial => "Business & Industrial",
            Category::Jewelry => "Jewelry",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TypeError::UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// An item listed for sale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    /// Asking price in cents.
    pub price_cents: u64,
    pub category: Category,
    /// Public image URLs, first is the cover.
    pub images: Vec<String>,
    pub seller_id: UserId,
    pub location: String,
    pub condition: Condition,
    pub created_at: Timestamp,
    pub is_archived: bool,
}

impl Product {
    /// Price formatted as dollars, e.g. `$18,500.00`.
    pub fn price_display(&self) -> String {
        let dollars = self.price_cents / 100;
        let cents = self.price_cents % 100;
        let digits = dollars.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("${grouped}.{cents:02}")
    }
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn key(&self) -> String {
        self.id.to_string()
    }
}
