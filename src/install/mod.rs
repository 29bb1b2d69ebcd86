//! Binary installation pipeline
//!
//! Resolves the release asset for the host platform, downloads it (using a
//! cached copy of the release metadata when fresh), verifies it against the
//! published SHA-256 checksum and promotes it to a deterministic path.

pub mod binary_staging;
pub mod cache;
pub mod detection;
pub mod download;
pub mod manifest;
pub mod orchestration;
pub mod verify;

// Public exports
pub use cache::{CacheStore, Clock, FileStore, ManualClock, MemoryStore, MetadataCache, SystemClock};
pub use detection::{InstallLayout, InstallationState, check_installation_state};
pub use download::{ReleaseAsset, ReleaseClient, ReleaseMetadata};
pub use manifest::InstallManifest;
pub use orchestration::{InstallOutcome, Installer};
pub use verify::Verification;

use crate::config::LauncherConfig;
use crate::error::Result;
use crate::platform::PlatformKey;

/// Ensure the binary for the running host is installed
///
/// This is the main entry point for the `kirha-mcp-install` binary.
///
/// # Behavior
/// - binary present → return immediately, no network access
/// - otherwise → fetch, verify and install the latest release
pub async fn ensure_installed(cfg: &LauncherConfig) -> Result<InstallOutcome> {
    ensure_installed_for_host(cfg, std::env::consts::OS, std::env::consts::ARCH).await
}

/// `ensure_installed` for explicit host-reported OS and architecture names.
///
/// Unsupported combinations fail before any network or disk access.
pub async fn ensure_installed_for_host(
    cfg: &LauncherConfig,
    os: &str,
    arch: &str,
) -> Result<InstallOutcome> {
    let platform = PlatformKey::from_host(os, arch)?;
    Installer::new(cfg, platform)?.ensure_installed().await
}
