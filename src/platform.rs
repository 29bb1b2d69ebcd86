//! Host platform resolution and release asset naming

use std::fmt;

use once_cell::sync::OnceCell;

use crate::error::{LauncherError, Result};

/// Suffix of the checksum asset published next to each binary
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Operating systems with a published binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

/// CPU architectures with a published binary, named as in release assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Os {
    fn from_host(os: &str) -> Option<Self> {
        match os {
            "macos" | "darwin" => Some(Os::Darwin),
            "linux" => Some(Os::Linux),
            "windows" | "win32" => Some(Os::Windows),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
        }
    }

    /// Executable suffix for this OS
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            Os::Windows => ".exe",
            Os::Darwin | Os::Linux => "",
        }
    }
}

impl Arch {
    fn from_host(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" | "x64" | "amd64" => Some(Arch::Amd64),
            "aarch64" | "arm64" => Some(Arch::Arm64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (OS, architecture) pair selecting which prebuilt binary to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    pub os: Os,
    pub arch: Arch,
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<PlatformKey> = OnceCell::new();

impl PlatformKey {
    /// Every platform a binary is published for
    pub const SUPPORTED: [PlatformKey; 6] = [
        PlatformKey { os: Os::Darwin, arch: Arch::Amd64 },
        PlatformKey { os: Os::Darwin, arch: Arch::Arm64 },
        PlatformKey { os: Os::Linux, arch: Arch::Amd64 },
        PlatformKey { os: Os::Linux, arch: Arch::Arm64 },
        PlatformKey { os: Os::Windows, arch: Arch::Amd64 },
        PlatformKey { os: Os::Windows, arch: Arch::Arm64 },
    ];

    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect current platform (cached after first call)
    pub fn detect() -> Result<Self> {
        PLATFORM_CACHE
            .get_or_try_init(|| Self::from_host(std::env::consts::OS, std::env::consts::ARCH))
            .copied()
    }

    /// Map host-reported OS and architecture identifiers to a platform key.
    ///
    /// Unmapped values are returned verbatim in the error for diagnostics.
    pub fn from_host(os: &str, arch: &str) -> Result<Self> {
        match (Os::from_host(os), Arch::from_host(arch)) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(LauncherError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Release asset name of the binary, e.g. `kirha-mcp-installer-linux-amd64`
    pub fn asset_name(&self, base: &str) -> String {
        format!("{base}-{}-{}{}", self.os, self.arch, self.os.exe_suffix())
    }

    /// Release asset name of the checksum sidecar for the binary
    pub fn checksum_asset_name(&self, base: &str) -> String {
        format!("{}{CHECKSUM_SUFFIX}", self.asset_name(base))
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
