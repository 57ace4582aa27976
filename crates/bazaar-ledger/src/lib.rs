//! Membership ledgers for Bazaar.
//!
//! Two keyed record stores with membership semantics:
//!
//! - [`WishlistLedger`] -- per-user set of saved products, keyed by
//!   `(user, product)`. Mutations require an authenticated [`Session`].
//! - [`GroupLedger`] -- named groups with a cached member count and
//!   membership rows keyed by `(group, user)`, plus the idempotent bootstrap
//!   of the default "Top Sale" group.
//!
//! Neither ledger holds locks or state of its own. Uniqueness is enforced by
//! the store's `insert_if_absent`; the member counter is only bumped by the
//! caller whose membership insert won, through a compare-and-swap loop.
//!
//! # Failure policy
//!
//! The wishlist surfaces failures as [`WishlistError`] values so callers can
//! tell "sign in first" apart from "try again later". The group ledger is
//! fail-soft: store failures are logged with `tracing` and turned into
//! `None`, `false` or an empty list.
//!
//! [`Session`]: bazaar_types::Session

pub mod config;
pub mod error;
pub mod groups;
pub mod wishlist;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::LedgerConfig;
pub use error::{WishlistError, WishlistResult};
pub use groups::{GroupLedger, DEFAULT_GROUP_NAME};
pub use wishlist::WishlistLedger;
