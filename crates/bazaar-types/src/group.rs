//! Group and membership records.
//!
//! A [`Group`] carries a cached `member_count`. The authoritative membership
//! facts are the [`GroupMembership`] rows keyed by `(group_id, user_id)`; the
//! counter is maintained by the group ledger and can be recomputed from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{GroupId, MembershipId, UserId};
use crate::record::Record;
use crate::Timestamp;

/// Longest accepted group name, in characters.
pub const MAX_GROUP_NAME_LEN: usize = 80;

/// What a caller supplies to create a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_public: bool,
    pub created_by: UserId,
}

impl GroupDescriptor {
    /// Check the descriptor before any record is written.
    pub fn validate(&self) -> Result<(), TypeError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TypeError::InvalidField {
                field: "name",
                reason: "must not be empty".into(),
            });
        }
        if name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(TypeError::InvalidField {
                field: "name",
                reason: format!("must be at most {MAX_GROUP_NAME_LEN} characters"),
            });
        }
        if self.category.trim().is_empty() {
            return Err(TypeError::InvalidField {
                field: "category",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// A named group of users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub is_public: bool,
    pub created_by: UserId,
    pub created_at: Timestamp,
    pub member_count: u64,
}

impl Group {
    /// Build the group row for `descriptor`, counting the creator as its
    /// first member.
    pub fn founded(id: GroupId, descriptor: GroupDescriptor, created_at: Timestamp) -> Self {
        Self {
            id,
            name: descriptor.name.trim().to_string(),
            description: descriptor.description,
            category: descriptor.category.trim().to_string(),
            is_public: descriptor.is_public,
            created_by: descriptor.created_by,
            created_at,
            member_count: 1,
        }
    }
}

impl Record for Group {
    const COLLECTION: &'static str = "groups";

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Role of a user within a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The user who created the group.
    Owner,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Member => f.write_str("member"),
        }
    }
}

/// A user's membership in a group. Keyed by `(group_id, user_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: MembershipId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub joined_at: Timestamp,
    pub role: Role,
}

impl GroupMembership {
    pub fn new(group_id: GroupId, user_id: UserId, role: Role, joined_at: Timestamp) -> Self {
        Self {
            id: MembershipId::generate(),
            group_id,
            user_id,
            joined_at,
            role,
        }
    }

    /// The storage key for the `(group, user)` pair.
    pub fn key_for(group_id: &GroupId, user_id: &UserId) -> String {
        format!("{group_id}/{user_id}")
    }
}

impl Record for GroupMembership {
    const COLLECTION: &'static str = "group_memberships";

    fn key(&self) -> String {
        Self::key_for(&self.group_id, &self.user_id)
    }
}
