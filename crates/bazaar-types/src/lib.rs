//! Foundation types for Bazaar.
//!
//! This crate provides the identifiers, records and session types shared by
//! every other Bazaar crate. It has no knowledge of storage backends; records
//! only describe which collection they live in and how they are keyed.
//!
//! # Key Types
//!
//! - [`UserId`], [`ProductId`], [`GroupId`], [`MembershipId`] -- identifiers
//! - [`WishlistEntry`] -- a saved (user, product) pair
//! - [`Group`], [`GroupMembership`], [`GroupDescriptor`] -- group records
//! - [`Product`] -- a marketplace listing
//! - [`Session`] -- the caller's identity, passed explicitly to operations
//! - [`Record`] -- collection/key mapping implemented by every stored record

pub mod error;
pub mod group;
pub mod ids;
pub mod product;
pub mod record;
pub mod session;
pub mod wishlist;

pub use error::TypeError;
pub use group::{Group, GroupDescriptor, GroupMembership, Role};
pub use ids::{GroupId, MembershipId, ProductId, UserId};
pub use product::{Category, Condition, Product};
pub use record::Record;
pub use session::{Identity, Session, UserProfile};
pub use wishlist::WishlistEntry;

/// Wall-clock timestamp used on every record.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
