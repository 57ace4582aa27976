//! Marketplace catalog for Bazaar.
//!
//! The [`Catalog`] owns the `products` collection and the listing image
//! bucket. It serves the browse and search views, validates and publishes new
//! listings, archives them on the seller's request and resolves a user's
//! wishlist to products.
//!
//! Listing input arrives as a [`ListingDraft`] of raw form strings and is
//! checked by [`validate`] before anything is uploaded or written.

pub mod catalog;
pub mod error;
pub mod listing;
pub mod search;
pub mod seed;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
pub use listing::{image_path, parse_price, validate, ImageUpload, ListingDraft, NewListing};
pub use search::SearchQuery;
pub use seed::demo_products;
