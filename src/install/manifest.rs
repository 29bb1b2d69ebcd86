//! Record of what was installed, written next to the binary

use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstallManifest {
    pub tag_name: String,
    pub asset: String,
    pub sha256: String,
    /// Whether the digest was checked against a published checksum
    pub verified: bool,
    pub installed_at: DateTime<Utc>,
}

impl InstallManifest {
    pub fn read(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Best-effort: the binary is usable without a manifest
    pub fn write(&self, path: &Path) {
        let result = serde_json::to_vec_pretty(self)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(path, bytes));
        if let Err(e) = result {
            warn!("Failed to write install manifest {}: {e}", path.display());
        }
    }
}
