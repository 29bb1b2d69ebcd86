//! Release metadata cache with a time-to-live
//!
//! The cache is shared by every installer run on the host. Anything that goes
//! wrong while reading it (missing, unreadable, malformed, expired) is a cache
//! miss; anything that goes wrong while writing it is a warning.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::download::ReleaseMetadata;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Settable clock for exercising expiry without waiting
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.0.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.0.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Byte storage behind the cache
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored
    fn load(&self) -> io::Result<Option<Vec<u8>>>;
    fn store(&self, bytes: &[u8]) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Cache file on disk, replaced whole on every write
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStore for FileStore {
    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        // Concurrent installers race on this file; last rename wins
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        io::Write::write_all(&mut tmp, bytes)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if let Some(dir) = self.path.parent() {
            // Only succeeds when nothing else lives there
            let _ = std::fs::remove_dir(dir);
        }
        Ok(())
    }
}

/// In-process store, used by tests and as a no-persistence fallback
#[derive(Debug, Default)]
pub struct MemoryStore(Mutex<Option<Vec<u8>>>);

impl MemoryStore {
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Mutex::new(Some(bytes.into())))
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        self.0
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| io::Error::other("memory store poisoned"))
    }

    fn store(&self, bytes: &[u8]) -> io::Result<()> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        *slot = Some(bytes.to_vec());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        *slot = None;
        Ok(())
    }
}

/// On-disk shape: `{"timestamp": <epoch millis>, "release": {...}}`
#[derive(Serialize, Deserialize, Debug)]
struct CacheEntry {
    timestamp: i64,
    release: ReleaseMetadata,
}

pub struct MetadataCache {
    store: Box<dyn CacheStore>,
    clock: Box<dyn Clock>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new(
        store: impl CacheStore + 'static,
        clock: impl Clock + 'static,
        ttl: Duration,
    ) -> Self {
        Self {
            store: Box::new(store),
            clock: Box::new(clock),
            ttl,
        }
    }

    /// File-backed cache on the system clock
    pub fn at_path(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::new(FileStore::new(path), SystemClock, ttl)
    }

    /// Cached release if an entry exists and is younger than the TTL
    pub fn get_cached(&self) -> Option<ReleaseMetadata> {
        let bytes = match self.store.load() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No cached release metadata");
                return None;
            }
            Err(e) => {
                debug!("Release cache unreadable, ignoring: {e}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Release cache malformed, ignoring: {e}");
                return None;
            }
        };

        let age_ms = self.clock.now().timestamp_millis() - entry.timestamp;
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        // A timestamp from the future cannot be trusted either
        if (0..ttl_ms).contains(&age_ms) {
            debug!(
                "Using cached release {} ({}s old)",
                entry.release.tag_name,
                age_ms / 1000
            );
            Some(entry.release)
        } else {
            debug!("Release cache expired ({}s old)", age_ms / 1000);
            None
        }
    }

    /// Write-through; failures are logged and otherwise ignored
    pub fn set_cached(&self, release: &ReleaseMetadata) {
        let entry = CacheEntry {
            timestamp: self.clock.now().timestamp_millis(),
            release: release.clone(),
        };
        let result = serde_json::to_vec(&entry)
            .map_err(io::Error::other)
            .and_then(|bytes| self.store.store(&bytes));
        if let Err(e) = result {
            warn!("Failed to cache release metadata: {e}");
        }
    }

    pub fn clear(&self) -> io::Result<()> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::download::ReleaseAsset;
    use chrono::TimeZone;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn release(tag: &str) -> ReleaseMetadata {
        ReleaseMetadata {
            tag_name: tag.to_string(),
            assets: vec![ReleaseAsset {
                name: "kirha-mcp-installer-linux-amd64".into(),
                browser_download_url: "https://example.invalid/bin".into(),
            }],
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn entry_valid_until_ttl_elapses() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = MetadataCache::new(MemoryStore::default(), clock.clone(), DAY);

        assert!(cache.get_cached().is_none());
        cache.set_cached(&release("v1.0.0"));
        assert_eq!(cache.get_cached(), Some(release("v1.0.0")));

        clock.advance(chrono::Duration::hours(24) - chrono::Duration::milliseconds(1));
        assert_eq!(cache.get_cached(), Some(release("v1.0.0")));

        clock.advance(chrono::Duration::milliseconds(1));
        assert!(cache.get_cached().is_none(), "exactly 24h old is expired");
    }

    #[test]
    fn malformed_entry_is_a_miss() {
        let cases: [&[u8]; 3] = [
            b"not json",
            br#"{"timestamp": 1}"#,
            br#"{"release": {"tag_name": "v1", "assets": []}}"#,
        ];
        for raw in cases {
            let store = MemoryStore::with_bytes(raw);
            let cache = MetadataCache::new(store, ManualClock::new(start()), DAY);
            assert!(cache.get_cached().is_none());
        }
    }

    #[test]
    fn future_timestamp_is_a_miss() {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = MetadataCache::new(MemoryStore::default(), clock.clone(), DAY);
        cache.set_cached(&release("v1"));
        clock.advance(chrono::Duration::minutes(-5));
        assert!(cache.get_cached().is_none());
    }

    #[test]
    fn file_store_round_trips_and_uses_epoch_millis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("version.json");
        let cache = MetadataCache::new(FileStore::new(&path), ManualClock::new(start()), DAY);

        cache.set_cached(&release("v3"));
        let on_disk: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk["timestamp"], start().timestamp_millis());
        assert_eq!(on_disk["release"]["tag_name"], "v3");
        assert_eq!(cache.get_cached(), Some(release("v3")));

        cache.clear().unwrap();
        assert!(!path.exists());
        assert!(cache.get_cached().is_none());
    }

    #[test]
    fn unwritable_location_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let cache = MetadataCache::at_path(blocker.join("version.json"), DAY);

        cache.set_cached(&release("v1"));
        assert!(cache.get_cached().is_none());
    }
}
