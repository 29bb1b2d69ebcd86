//! SHA-256 verification of downloaded binaries against published checksums

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::{info, warn};
use sha2::{Digest, Sha256};

/// Outcome of checking a binary against its checksum sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// No sidecar on disk; nothing to compare against
    NoChecksum,
    Match { digest: String },
    Mismatch { expected: String, actual: String },
}

impl Verification {
    pub fn passed(&self) -> bool {
        !matches!(self, Verification::Mismatch { .. })
    }
}

/// Lowercase hex SHA-256 of a file, streamed
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Expected digest from sidecar contents: the first whitespace-delimited token
pub fn parse_checksum(contents: &str) -> Option<&str> {
    contents.split_whitespace().next()
}

/// Compare `binary` against the digest recorded in `checksum`.
///
/// Comparison is exact, so an uppercase digest in the sidecar does not match.
pub fn check(binary: &Path, checksum: &Path) -> io::Result<Verification> {
    match std::fs::read_to_string(checksum) {
        Ok(contents) => compare(binary, &contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Checksum file not found, skipping verification");
            Ok(Verification::NoChecksum)
        }
        Err(e) => Err(e),
    }
}

/// `check` for a sidecar that was just downloaded: a missing file is an error,
/// never a skipped verification.
pub fn check_downloaded(binary: &Path, checksum: &Path) -> io::Result<Verification> {
    let contents = std::fs::read_to_string(checksum)?;
    compare(binary, &contents)
}

fn compare(binary: &Path, sidecar: &str) -> io::Result<Verification> {
    let expected = parse_checksum(sidecar).unwrap_or_default().to_string();
    let actual = sha256_file(binary)?;

    if actual == expected {
        info!("✓ Checksum verification passed");
        Ok(Verification::Match { digest: actual })
    } else {
        warn!("Checksum verification failed! Expected: {expected}, Actual: {actual}");
        Ok(Verification::Mismatch { expected, actual })
    }
}

/// `true` when the sidecar is absent or its digest matches the binary
pub fn verify(binary: &Path, checksum: &Path) -> io::Result<bool> {
    check(binary, checksum).map(|v| v.passed())
}
