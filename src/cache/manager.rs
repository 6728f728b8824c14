//! TTL cache for persisting a JSON collection to disk
//!
//! Provides a `JsonCache` that stores one serializable value per file. Freshness
//! is derived from the file's modification time rather than from a field inside
//! the document, so the stored JSON is exactly what the caller saved.

use chrono::{DateTime, TimeDelta, Utc};
use directories::{BaseDirs, ProjectDirs};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::to_pretty_json;
use crate::duration::{parse_duration, Duration, DurationError};

/// File name of the collection inside the default cache directory
const CACHE_FILE_NAME: &str = "models.json";

/// Errors that can occur when using the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The configured validity window is zero or negative
    #[error("Cache duration must be positive, got {0}")]
    NonPositiveDuration(String),

    /// The validity window could not be parsed
    #[error(transparent)]
    Duration(#[from] DurationError),

    /// `load` was called while no fresh entry exists
    #[error("Cache at {} is invalid (missing or expired)", .0.display())]
    Invalid(PathBuf),

    /// Reading or writing the cache file failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The stored document could not be encoded or decoded
    #[error("Cache contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An immutable, whole-file JSON cache with a time-to-live
///
/// An entry is either absent, valid (age within the configured duration) or
/// stale. Entries are never patched: `save` replaces the file wholesale and
/// `clear` deletes it. Regenerating stale data is the caller's job; `load`
/// only ever returns what is on disk.
///
/// Writes are plain overwrites. An interrupted write can leave a corrupt file
/// behind, and two processes sharing one path may race; neither case is guarded.
#[derive(Debug, Clone)]
pub struct JsonCache {
    /// Location of the cache file
    path: PathBuf,
    /// How long a saved entry stays valid
    ttl: TimeDelta,
}

impl JsonCache {
    /// Creates a cache at `path` valid for `duration`
    ///
    /// A leading `~` in `path` is expanded to the home directory.
    ///
    /// # Returns
    /// * `Ok(JsonCache)` if the duration is strictly positive
    /// * `Err(CacheError::NonPositiveDuration)` otherwise
    pub fn new(path: impl AsRef<Path>, duration: Duration) -> Result<Self, CacheError> {
        let ttl = duration.elapsed();
        if ttl <= TimeDelta::zero() {
            return Err(CacheError::NonPositiveDuration(duration.calendar().to_string()));
        }

        Ok(Self {
            path: expand_home(path.as_ref()),
            ttl,
        })
    }

    /// Creates a cache from a human-readable duration such as `"1 day"`
    pub fn from_spec(path: impl AsRef<Path>, duration: &str) -> Result<Self, CacheError> {
        let duration = parse_duration(duration)?;
        Self::new(path, duration)
    }

    /// Default cache file location
    ///
    /// Uses `~/.cache/ollama-data/models.json` on Linux, or the equivalent
    /// platform cache directory. Returns `None` if no home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "ollama-data")?;
        Some(project_dirs.cache_dir().join(CACHE_FILE_NAME))
    }

    /// The cache file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured validity window
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Last write time of the entry, or `None` if there is no entry
    fn modified_at(&self) -> Option<DateTime<Utc>> {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot stat cache file");
                return None;
            }
        };
        Some(DateTime::<Utc>::from(modified))
    }

    /// Age of the entry at `now`, clamped at zero for files stamped in the future
    fn age_at(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.modified_at()
            .map(|modified| (now - modified).max(TimeDelta::zero()))
    }

    /// Time left before the entry expires; zero if absent or already expired
    pub fn time_remaining(&self) -> TimeDelta {
        self.time_remaining_at(Utc::now())
    }

    /// Time left before the entry expires, measured at `now`
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.age_at(now) {
            Some(age) => (self.ttl - age).max(TimeDelta::zero()),
            None => TimeDelta::zero(),
        }
    }

    /// Whether an entry exists and is no older than the configured duration
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Whether an entry exists and is no older than the configured duration at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now).is_some_and(|age| age <= self.ttl)
    }

    /// Reads the stored value
    ///
    /// # Returns
    /// * `Ok(T)` if the entry is valid and decodes as `T`
    /// * `Err(CacheError::Invalid)` if the entry is missing or stale
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, CacheError> {
        self.load_at(Utc::now())
    }

    /// Reads the stored value, judging freshness at `now`
    pub fn load_at<T: DeserializeOwned>(&self, now: DateTime<Utc>) -> Result<T, CacheError> {
        if !self.is_valid_at(now) {
            return Err(CacheError::Invalid(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let value = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), "cache hit");
        Ok(value)
    }

    /// Replaces the entry with `data` and resets its timestamp
    ///
    /// Parent directories are created when missing.
    pub fn save<T: Serialize>(&self, data: &T) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.path, to_pretty_json(data)?)?;
        debug!(path = %self.path.display(), "cache saved");
        Ok(())
    }

    /// Deletes the entry; does nothing if there is none
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Expands a leading `~` to the user's home directory
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}
