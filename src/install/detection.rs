//! Installation state detection
//!
//! The installed binary lives at a deterministic path derived from the
//! platform key. Its presence alone means "installed". Everything else an
//! install writes (staged binary, staged checksum, in-flight `.partial`
//! bodies) is named `.<asset>.*` and only exists while an install is running,
//! so finding such files without a binary means an earlier run was
//! interrupted.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::config::LauncherConfig;
use crate::platform::{CHECKSUM_SUFFIX, PlatformKey};

/// Staging files older than this are assumed abandoned
const STALE_STAGING_AGE: Duration = Duration::from_secs(10 * 60);

const STAGING_SUFFIX: &str = ".download";

/// Distinguishes staging names handed out within one process
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Suffix of the temporary file a download streams into
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Installation state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationState {
    /// No binary and nothing left over
    NotInstalled,
    /// No binary, but staging or partial files from an interrupted run
    PartiallyInstalled,
    /// Binary present at its final path
    Installed,
}

/// Paths of everything an install attempt touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub dir: PathBuf,
    pub asset_name: String,
    pub binary: PathBuf,
    pub manifest: PathBuf,
}

impl InstallLayout {
    pub fn new(dir: impl Into<PathBuf>, platform: &PlatformKey, binary_name: &str) -> Self {
        let dir = dir.into();
        let asset_name = platform.asset_name(binary_name);
        Self {
            binary: dir.join(&asset_name),
            manifest: dir.join(format!("{asset_name}.manifest.json")),
            asset_name,
            dir,
        }
    }

    pub fn from_config(cfg: &LauncherConfig, platform: &PlatformKey) -> Self {
        Self::new(cfg.install_dir(), platform, &cfg.binary_name)
    }

    /// Process-unique path the binary is downloaded to before it is promoted
    pub fn staging_path(&self) -> PathBuf {
        self.unique_path("")
    }

    /// Process-unique path the checksum asset is downloaded to
    pub fn checksum_staging_path(&self) -> PathBuf {
        self.unique_path(CHECKSUM_SUFFIX)
    }

    fn unique_path(&self, tag: &str) -> PathBuf {
        self.dir.join(self.unique_name(tag))
    }

    fn unique_name(&self, tag: &str) -> String {
        let tag = tag.trim_start_matches('.');
        let tag = if tag.is_empty() {
            String::new()
        } else {
            format!("{tag}.")
        };
        format!(
            "{}{tag}{}-{}.{}{STAGING_SUFFIX}",
            self.staging_prefix(),
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed),
            chrono::Utc::now().timestamp_millis()
        )
    }

    fn staging_prefix(&self) -> String {
        format!(".{}.", self.asset_name)
    }

    fn is_staging_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(&self.staging_prefix())
                    && (name.ends_with(STAGING_SUFFIX) || name.ends_with(PARTIAL_SUFFIX))
            })
    }

    /// Staging and partial files for this asset in the install directory
    fn staging_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| self.is_staging_file(path))
            .collect()
    }
}

/// Classify the install directory for `layout`
pub fn check_installation_state(layout: &InstallLayout) -> InstallationState {
    if layout.binary.is_file() {
        InstallationState::Installed
    } else if !layout.staging_files().is_empty() {
        InstallationState::PartiallyInstalled
    } else {
        InstallationState::NotInstalled
    }
}

/// Remove abandoned staging and partial files left by an interrupted run.
///
/// Files younger than a few minutes may belong to a concurrent installer and
/// are kept.
pub fn remove_leftovers(layout: &InstallLayout) {
    let now = SystemTime::now();
    for path in layout.staging_files() {
        let age = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age >= STALE_STAGING_AGE {
            remove_quietly(&path);
        } else {
            debug!("Keeping recent staging file {}", path.display());
        }
    }
}

/// Delete `path` if present; other failures are logged
pub fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {e}", path.display()),
    }
}
