//! Identifier newtypes.
//!
//! User and product identifiers are opaque strings supplied by the identity
//! provider and the catalog. They become path segments in storage keys, so
//! they are validated on construction and on deserialization.
//!
//! Group and membership identifiers are UUIDs. User-created groups get a
//! time-ordered v7 id; bootstrap groups get a v5 id derived from their name so
//! that every process computes the same id for the same default group.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Longest accepted user or product identifier.
pub const MAX_ID_LEN: usize = 128;

/// Namespace for name-derived group ids.
const GROUP_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x1d, 0x3a, 0x52, 0x90, 0x4e, 0x4c, 0x0f, 0x9a, 0x61, 0x2e, 0x7c, 0x44, 0xd8, 0x15, 0xb3,
]);

fn validate_segment(value: &str) -> Result<(), TypeError> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.len() > MAX_ID_LEN {
        "too long"
    } else if value.contains('/') {
        "must not contain '/'"
    } else if value.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };
    Err(TypeError::InvalidId {
        value: value.to_string(),
        reason: reason.into(),
    })
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, validating that it is usable as a key segment.
            pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                validate_segment(&value)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

string_id! {
    /// Identity of a marketplace user, as issued by the identity provider.
    UserId
}

string_id! {
    /// Identity of a catalog listing.
    ProductId
}

impl UserId {
    /// The reserved identity that owns bootstrap data.
    pub fn system() -> Self {
        Self("system".into())
    }
}

/// Identity of a group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    /// A fresh, time-ordered group id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// The deterministic id for a group seeded under `name`.
    pub fn for_name(name: &str) -> Self {
        Self(Uuid::new_v5(&GROUP_NAMESPACE, name.as_bytes()))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for GroupId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self).map_err(|e| TypeError::InvalidId {
            value: s.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

/// Identity of a single membership row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipId(Uuid);

impl MembershipId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for MembershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
