//! Install state machine
//!
//! `CheckExisting` → (`Satisfied` | `ResolveMetadata` → `LocateAsset` →
//! `Download` → `VerifyIfPresent` → `Finalize`). The binary and its checksum
//! are downloaded to per-run staging paths, so concurrent installers never
//! read each other's files. Any failure after `CheckExisting` removes both
//! before the error is returned, so a re-run always starts clean.

use std::path::PathBuf;

use chrono::Utc;
use log::{info, warn};

use super::binary_staging;
use super::cache::MetadataCache;
use super::detection::{
    InstallLayout, InstallationState, check_installation_state, remove_leftovers,
    remove_quietly,
};
use super::download::{ReleaseAsset, ReleaseClient, ReleaseMetadata};
use super::manifest::InstallManifest;
use super::verify::{self, Verification};
use crate::config::LauncherConfig;
use crate::error::{LauncherError, Result};
use crate::platform::PlatformKey;

/// How an install attempt ended successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Binary was already present; nothing was fetched
    AlreadyInstalled { path: PathBuf },
    /// Binary was downloaded and promoted to its final path
    Installed {
        path: PathBuf,
        tag_name: String,
        /// `None` when verification was disabled by configuration
        verification: Option<Verification>,
    },
}

/// Per-run download targets inside the install directory
struct Staging {
    binary: PathBuf,
    checksum: PathBuf,
}

pub struct Installer {
    platform: PlatformKey,
    binary_name: String,
    layout: InstallLayout,
    client: ReleaseClient,
    cache: MetadataCache,
    verify_checksum: bool,
}

impl Installer {
    /// Installer using the on-disk metadata cache from `cfg`
    pub fn new(cfg: &LauncherConfig, platform: PlatformKey) -> Result<Self> {
        let cache = MetadataCache::at_path(cfg.cache_file(), cfg.cache_ttl());
        Self::with_cache(cfg, platform, cache)
    }

    pub fn with_cache(
        cfg: &LauncherConfig,
        platform: PlatformKey,
        cache: MetadataCache,
    ) -> Result<Self> {
        Ok(Self {
            platform,
            binary_name: cfg.binary_name.clone(),
            layout: InstallLayout::from_config(cfg, &platform),
            client: ReleaseClient::new(cfg)?,
            cache,
            verify_checksum: cfg.verify_checksum,
        })
    }

    /// Make sure the platform binary is present, fetching it if needed
    pub async fn ensure_installed(&self) -> Result<InstallOutcome> {
        info!(
            "Installing {} for {} {}",
            self.binary_name, self.platform.os, self.platform.arch
        );
        info!("Binary: {}", self.layout.asset_name);

        match check_installation_state(&self.layout) {
            InstallationState::Installed => {
                info!("Binary already exists, skipping download");
                binary_staging::make_executable_best_effort(&self.layout.binary);
                return Ok(InstallOutcome::AlreadyInstalled {
                    path: self.layout.binary.clone(),
                });
            }
            InstallationState::PartiallyInstalled => {
                info!("Cleaning up after an interrupted install");
                remove_leftovers(&self.layout);
            }
            InstallationState::NotInstalled => {}
        }

        let staging = Staging {
            binary: self.layout.staging_path(),
            checksum: self.layout.checksum_staging_path(),
        };
        let result = self.fetch_and_install(&staging).await;
        if result.is_err() {
            remove_quietly(&staging.binary);
            remove_quietly(&staging.checksum);
        }
        result
    }

    async fn fetch_and_install(&self, staging: &Staging) -> Result<InstallOutcome> {
        std::fs::create_dir_all(&self.layout.dir).map_err(|e| {
            LauncherError::io(
                format!(
                    "Failed to create install directory {}",
                    self.layout.dir.display()
                ),
                e,
            )
        })?;

        let release = self.resolve_metadata().await?;
        let (binary_asset, checksum_asset) = self.locate_assets(&release)?;

        self.client
            .download_asset(&binary_asset.browser_download_url, &staging.binary)
            .await?;
        info!("✓ Downloaded {}", binary_asset.name);

        let verification = self.verify_if_present(staging, checksum_asset).await?;
        if let Some(Verification::Mismatch { expected, actual }) = verification.clone() {
            return Err(LauncherError::ChecksumMismatch {
                asset: binary_asset.name.clone(),
                expected,
                actual,
            });
        }

        // Finalize
        binary_staging::make_executable_best_effort(&staging.binary);
        binary_staging::promote(&staging.binary, &self.layout.binary).map_err(|e| {
            LauncherError::io(
                format!("Failed to move binary into {}", self.layout.binary.display()),
                e,
            )
        })?;
        self.write_manifest(&release, verification.as_ref());

        Ok(InstallOutcome::Installed {
            path: self.layout.binary.clone(),
            tag_name: release.tag_name,
            verification,
        })
    }

    /// Fresh cache entry, else a live fetch written through to the cache
    async fn resolve_metadata(&self) -> Result<ReleaseMetadata> {
        if let Some(release) = self.cache.get_cached() {
            info!("Using cached release information ({})", release.tag_name);
            return Ok(release);
        }
        let release = self.client.fetch_latest_release().await?;
        self.cache.set_cached(&release);
        Ok(release)
    }

    /// Exact-name lookup of the binary and its optional checksum asset
    fn locate_assets<'r>(
        &self,
        release: &'r ReleaseMetadata,
    ) -> Result<(&'r ReleaseAsset, Option<&'r ReleaseAsset>)> {
        let binary = release.find_asset(&self.layout.asset_name).ok_or_else(|| {
            LauncherError::AssetNotFound {
                asset: self.layout.asset_name.clone(),
                platform: self.platform.to_string(),
                available: release.asset_names_with_prefix(&format!("{}-", self.binary_name)),
            }
        })?;
        let checksum_name = self.platform.checksum_asset_name(&self.binary_name);
        let checksum = release.find_asset(&checksum_name);
        Ok((binary, checksum))
    }

    /// Download the checksum (if published), check the staged binary, then drop the checksum
    async fn verify_if_present(
        &self,
        staging: &Staging,
        checksum_asset: Option<&ReleaseAsset>,
    ) -> Result<Option<Verification>> {
        if !self.verify_checksum {
            warn!("Checksum verification disabled, skipping");
            return Ok(None);
        }
        let Some(asset) = checksum_asset else {
            warn!("Checksum file not found, skipping verification");
            return Ok(Some(Verification::NoChecksum));
        };

        self.client
            .download_asset(&asset.browser_download_url, &staging.checksum)
            .await?;
        let verification = verify::check_downloaded(&staging.binary, &staging.checksum)
            .map_err(|e| {
                LauncherError::io(format!("Failed to verify {}", staging.binary.display()), e)
            })?;
        remove_quietly(&staging.checksum);
        Ok(Some(verification))
    }

    fn write_manifest(&self, release: &ReleaseMetadata, verification: Option<&Verification>) {
        let sha256 = match verification {
            Some(Verification::Match { digest }) => digest.clone(),
            _ => match verify::sha256_file(&self.layout.binary) {
                Ok(digest) => digest,
                Err(e) => {
                    warn!("Failed to hash installed binary: {e}");
                    return;
                }
            },
        };
        InstallManifest {
            tag_name: release.tag_name.clone(),
            asset: self.layout.asset_name.clone(),
            sha256,
            verified: matches!(verification, Some(Verification::Match { .. })),
            installed_at: Utc::now(),
        }
        .write(&self.layout.manifest);
    }
}
