//! Caller identity.
//!
//! A [`Session`] is an explicit value handed to every operation that needs to
//! know who is calling. There is no ambient "current user": two sessions can
//! coexist in one process and tests construct whichever one they need.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Profile of a signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Who is making a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// Browsing without an account. May read, may not mutate.
    Guest,
    User(UserProfile),
}

/// The identity context carried by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    identity: Identity,
}

impl Session {
    pub fn guest() -> Self {
        Self {
            identity: Identity::Guest,
        }
    }

    pub fn user(profile: UserProfile) -> Self {
        Self {
            identity: Identity::User(profile),
        }
    }

    /// A session for a bare user id, with no profile details.
    pub fn for_user_id(id: UserId) -> Self {
        Self::user(UserProfile {
            name: id.to_string(),
            email: String::new(),
            id,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The authenticated user id, or `None` for guests.
    pub fn user_id(&self) -> Option<&UserId> {
        match &self.identity {
            Identity::User(profile) => Some(&profile.id),
            Identity::Guest => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }
}
