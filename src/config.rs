use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};

/// Environment toggle for checksum verification
pub const VERIFY_CHECKSUM_ENV: &str = "VERIFY_CHECKSUM";
pub const INSTALL_DIR_ENV: &str = "KIRHA_MCP_INSTALL_DIR";
pub const CACHE_DIR_ENV: &str = "KIRHA_MCP_CACHE_DIR";
pub const RELEASE_API_ENV: &str = "KIRHA_MCP_RELEASE_API";

const APP_DIR: &str = "kirha-mcp-installer";
const CACHE_FILE: &str = "version.json";

fn default_repo() -> String {
    "kirha-ai/kirha-mcp-installer".to_string()
}

fn default_binary_name() -> String {
    "kirha-mcp-installer".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    "kirha-mcp-installer-launcher".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_metadata_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    600
}

fn default_download_inactivity_secs() -> u64 {
    300
}

fn default_max_redirects() -> usize {
    5
}

/// Installer and launcher configuration (defaults mirror the published release layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// GitHub `owner/name` the binary is released from
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Base identifier of the release assets
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Where the platform binary is installed
    pub install_dir: Option<PathBuf>,
    /// Where release metadata is cached between runs
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    /// Abort a download when no data arrives for this long
    #[serde(default = "default_download_inactivity_secs")]
    pub download_inactivity_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            binary_name: default_binary_name(),
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            install_dir: None,
            cache_dir: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            verify_checksum: true,
            connect_timeout_secs: default_connect_timeout_secs(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            download_inactivity_secs: default_download_inactivity_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl LauncherConfig {
    /// Load configuration: defaults, then TOML file, then environment overrides.
    ///
    /// An explicit `path` must exist; the per-user config file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LauncherError::io(format!("Failed to read config {}", path.display()), e)
        })?;
        let cfg: Self = toml::from_str(&raw)
            .map_err(|e| LauncherError::Config(format!("{}: {e}", path.display())))?;
        info!("Using config from: {}", path.display());
        Ok(cfg)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(VERIFY_CHECKSUM_ENV) {
            match parse_bool(&raw) {
                Some(value) => self.verify_checksum = value,
                None => warn!(
                    "Ignoring {VERIFY_CHECKSUM_ENV}={raw:?}: expected true/false, keeping {}",
                    self.verify_checksum
                ),
            }
        }
        if let Some(dir) = lookup(INSTALL_DIR_ENV).filter(|v| !v.is_empty()) {
            self.install_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup(RELEASE_API_ENV).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
    }

    /// Directory holding the installed binary
    pub fn install_dir(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir {
            return dir.clone();
        }
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        default_install_dir(exe_dir.as_deref(), dirs::data_local_dir().as_deref())
    }

    /// Path of the release metadata cache file
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{APP_DIR}-cache")))
            .join(CACHE_FILE)
    }

    /// Endpoint returning the latest release of `repo`
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_base_url.trim_end_matches('/'),
            self.repo
        )
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn download_inactivity(&self) -> Duration {
        Duration::from_secs(self.download_inactivity_secs)
    }
}

/// `<exe dir>/bin` when it already exists or can be created, else the per-user
/// data directory.
///
/// An existing `bin` wins even when read-only, so a launcher run by another
/// user still finds a binary installed there.
fn default_install_dir(exe_dir: Option<&Path>, data_dir: Option<&Path>) -> PathBuf {
    if let Some(exe_dir) = exe_dir {
        let bin = exe_dir.join("bin");
        if bin.is_dir() || tempfile::tempfile_in(exe_dir).is_ok() {
            return bin;
        }
    }
    match (data_dir, exe_dir) {
        (Some(data), _) => {
            debug!("Executable directory not writable, installing under {}", data.display());
            data.join(APP_DIR).join("bin")
        }
        (None, Some(exe_dir)) => exe_dir.join("bin"),
        (None, None) => PathBuf::from("bin"),
    }
}

/// Per-user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn verifies_by_default() {
        let mut cfg = LauncherConfig::default();
        cfg.apply_env(env(&[]));
        assert!(cfg.verify_checksum);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.max_redirects, 5);
    }

    #[test]
    fn verify_checksum_env_toggle() {
        let cases = [
            ("false", false),
            ("0", false),
            ("OFF", false),
            ("true", true),
            ("yes", true),
        ];
        for (raw, want) in cases {
            let mut cfg = LauncherConfig::default();
            cfg.verify_checksum = !want;
            cfg.apply_env(env(&[(VERIFY_CHECKSUM_ENV, raw)]));
            assert_eq!(cfg.verify_checksum, want, "{raw}");
        }
    }

    #[test]
    fn garbage_verify_value_keeps_default() {
        let mut cfg = LauncherConfig::default();
        cfg.apply_env(env(&[(VERIFY_CHECKSUM_ENV, "maybe")]));
        assert!(cfg.verify_checksum);
    }

    #[test]
    fn directory_and_api_overrides() {
        let mut cfg = LauncherConfig::default();
        cfg.apply_env(env(&[
            (INSTALL_DIR_ENV, "/opt/kirha/bin"),
            (CACHE_DIR_ENV, "/var/cache/kirha"),
            (RELEASE_API_ENV, "http://127.0.0.1:9000/"),
        ]));
        assert_eq!(cfg.install_dir(), PathBuf::from("/opt/kirha/bin"));
        assert_eq!(cfg.cache_file(), PathBuf::from("/var/cache/kirha/version.json"));
        assert_eq!(
            cfg.latest_release_url(),
            "http://127.0.0.1:9000/repos/kirha-ai/kirha-mcp-installer/releases/latest"
        );
    }

    #[test]
    fn install_dir_prefers_the_executable_tree() {
        let exe = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        assert_eq!(
            default_install_dir(Some(exe.path()), Some(data.path())),
            exe.path().join("bin")
        );

        std::fs::create_dir(exe.path().join("bin")).unwrap();
        assert_eq!(
            default_install_dir(Some(exe.path()), Some(data.path())),
            exe.path().join("bin")
        );
    }

    #[test]
    fn install_dir_falls_back_to_data_dir() {
        let data = tempfile::tempdir().unwrap();
        let missing = data.path().join("no-such-exe-dir");
        assert_eq!(
            default_install_dir(Some(&missing), Some(data.path())),
            data.path().join("kirha-mcp-installer").join("bin")
        );
        assert_eq!(default_install_dir(Some(&missing), None), missing.join("bin"));
    }

    #[test]
    fn toml_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "verify_checksum = false\nmax_redirects = 2\n").unwrap();

        let cfg = LauncherConfig::from_file(&path).unwrap();
        assert!(!cfg.verify_checksum);
        assert_eq!(cfg.max_redirects, 2);
        assert_eq!(cfg.repo, "kirha-ai/kirha-mcp-installer");
        assert_eq!(cfg.metadata_timeout_secs, 30);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_redirects = \"many\"").unwrap();
        assert!(matches!(
            LauncherConfig::from_file(&path),
            Err(LauncherError::Config(_))
        ));
    }
}
