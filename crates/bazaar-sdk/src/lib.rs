//! High-level SDK for Bazaar.
//!
//! [`Bazaar`] is the single entry point: it opens the configured row store
//! and listing bucket, wires the wishlist and group ledgers and the catalog
//! over them, and runs the startup bootstrap.
//!
//! ```no_run
//! # async fn demo() -> bazaar_sdk::SdkResult<()> {
//! use bazaar_sdk::{auth, Bazaar, BazaarConfig};
//!
//! let bazaar = Bazaar::open(BazaarConfig::default())?;
//! bazaar.start().await?;
//!
//! let alice = auth::sign_in("alice@example.com", "Alice")?;
//! let groups = bazaar.groups().get_groups().await;
//! bazaar.wishlist().toggle(&alice, &"2".parse()?).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod bazaar;
pub mod config;
pub mod error;

pub use bazaar::{Bazaar, StartReport};
pub use config::BazaarConfig;
pub use error::{SdkError, SdkResult};
