use bazaar_types::{Category, Product};
use serde::{Deserialize, Serialize};

/// A catalog search: free-text term plus optional category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub term: String,
    pub category: Option<Category>,
}

impl SearchQuery {
    pub fn term(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            category: None,
        }
    }

    pub fn in_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// A query with neither a term nor a category matches nothing.
    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty() && self.category.is_none()
    }

    /// Case-insensitive substring match on title, description and location,
    /// restricted to the category if one is set.
    pub fn matches(&self, product: &Product) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(category) = self.category {
            if product.category != category {
                return false;
            }
        }
        let needle = self.term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&product.title, &product.description, &product.location]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}
