//! Error taxonomy shared by the installer and the launcher

use std::path::PathBuf;

use thiserror::Error;

/// Why an asset download failed
#[derive(Debug, Error)]
pub enum DownloadFailure {
    #[error("HTTP {code} {message}")]
    Status { code: u16, message: String },

    #[error("too many redirects (limit {limit})")]
    TooManyRedirects { limit: usize },

    #[error("redirect response without a usable Location header")]
    MissingLocation,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no data received for {secs} seconds")]
    Stalled { secs: u64 },

    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while resolving, installing or launching the binary
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Release request to {url} failed: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to parse release metadata: {0}")]
    MetadataParse(String),

    #[error(
        "Binary not found for your platform: {asset} (platform: {platform}). \
         Available binaries: {}",
        format_available(.available)
    )]
    AssetNotFound {
        asset: String,
        platform: String,
        available: Vec<String>,
    },

    #[error("Failed to download {url}")]
    Download {
        url: String,
        #[source]
        reason: DownloadFailure,
    },

    #[error("Checksum verification failed for {asset}: expected {expected}, actual {actual}")]
    ChecksumMismatch {
        asset: String,
        expected: String,
        actual: String,
    },

    #[error(
        "Binary not found: {} (platform: {platform}). Run kirha-mcp-install first.",
        .path.display()
    )]
    BinaryNotFound { path: PathBuf, platform: String },

    #[error("Failed to start {}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

pub type Result<T, E = LauncherError> = std::result::Result<T, E>;

impl LauncherError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LauncherError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for a failure on the installer/launcher side.
    ///
    /// Child failures never reach this: their exit code is passed through as-is.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether re-running later might succeed (network-side failures)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LauncherError::Network { .. }
                | LauncherError::MetadataParse(_)
                | LauncherError::Download { .. }
        )
    }

    /// Actionable guidance printed after a transient installation failure
    pub fn troubleshooting(&self, repo: &str, binary_path: &std::path::Path) -> Vec<String> {
        if !self.is_transient() {
            return Vec::new();
        }
        vec![
            "1. Check your internet connection".to_string(),
            "2. Verify the GitHub repository exists and has releases".to_string(),
            "3. Try installing again later".to_string(),
            format!("4. Download manually from: https://github.com/{repo}/releases"),
            format!("5. Place the binary manually in: {}", binary_path.display()),
        ]
    }
}
