use std::path::{Path, PathBuf};

use bazaar_ledger::LedgerConfig;
use bazaar_types::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Configuration for a [`Bazaar`](crate::Bazaar) handle.
///
/// Loaded from TOML; every field has a default, so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BazaarConfig {
    /// JSON file backing the row store. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
    /// Directory backing the listing bucket. When unset and `data_path` is
    /// set, a directory named after the bucket next to the data file is used.
    pub image_dir: Option<PathBuf>,
    /// Base URL listing images are served from.
    pub public_base_url: String,
    /// Bucket listing images are uploaded to.
    pub listing_bucket: String,
    /// Creator recorded on bootstrap data. Takes precedence over
    /// `ledger.system_user`.
    pub system_user: UserId,
    pub ledger: LedgerConfig,
}

impl Default for BazaarConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            image_dir: None,
            public_base_url: "http://localhost:8080/storage".into(),
            listing_bucket: "product-images".into(),
            system_user: UserId::system(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl BazaarConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Where listing images are written, or `None` to keep them in memory.
    pub fn image_root(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.image_dir {
            return Some(dir.clone());
        }
        let data = self.data_path.as_ref()?;
        let parent = data.parent().unwrap_or_else(|| Path::new(""));
        Some(parent.join(&self.listing_bucket))
    }

    /// The ledger settings with the top-level system user applied.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            system_user: self.system_user.clone(),
            ..self.ledger.clone()
        }
    }
}
