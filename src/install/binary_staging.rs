//! Promoting a verified download to its final path
//!
//! The binary is downloaded and verified under a staging name in the install
//! directory, made executable there, and only then renamed onto the final
//! path. Readers therefore see either no binary or a complete, verified one.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

/// Set 0755 on Unix; no-op elsewhere
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

/// `make_executable`, downgraded to a warning (some filesystems refuse chmod)
pub fn make_executable_best_effort(path: &Path) {
    if let Err(e) = make_executable(path) {
        warn!("Failed to make binary executable: {e:#}");
    }
}

/// Whether `path` is a file the current user could execute (any x bit on Unix)
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        metadata.is_file()
    }
}

/// Move the staged binary onto its final path
pub fn promote(staging: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::rename(staging, destination)?;
    info!("Installed {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn sets_0755() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        make_executable(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_decides_readiness() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        assert!(!is_executable(&path));

        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!is_executable(&path));

        make_executable(&path).unwrap();
        assert!(is_executable(&path));
        assert!(!is_executable(dir.path()));
    }

    #[test]
    fn missing_file_is_an_error_but_best_effort_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        if cfg!(unix) {
            assert!(make_executable(&path).is_err());
        }
        make_executable_best_effort(&path);
    }

    #[test]
    fn promote_replaces_staging_name() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(".tool.1.download");
        let dest = dir.path().join("tool");
        std::fs::write(&staging, b"payload").unwrap();

        promote(&staging, &dest).unwrap();
        assert!(!staging.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }
}
