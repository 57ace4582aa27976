use bazaar_types::UserId;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the ledgers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How many times a member-count update is retried after losing a
    /// compare-and-swap race before giving up.
    pub max_cas_retries: u32,
    /// Identity recorded as the creator of bootstrap groups.
    pub system_user: UserId,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_cas_retries: 16,
            system_user: UserId::system(),
        }
    }
}
