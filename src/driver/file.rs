//! File-system cache driver: one JSON document per key.

use super::{CacheDriver, ConfiguredDriver, DriverSettings};
use crate::error::{Error, Result};
use crate::options::{DriverConfig, OptionSchema, OptionSet, OptionType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Option key: directory holding the entry files.
pub const PATH: &str = "path";

/// Option key: file extension of entry files.
pub const EXTENSION: &str = "extension";

const DEFAULT_EXTENSION: &str = "cache";

/// Configuration for [`FileDriver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileConfig {
    pub settings: DriverSettings,
    pub path: PathBuf,
    pub extension: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            settings: DriverSettings::default(),
            path: std::env::temp_dir().join("cache-registry"),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl DriverConfig for FileConfig {
    fn schema() -> OptionSchema {
        DriverSettings::schema()
            .required(PATH, OptionType::String)
            .optional(EXTENSION, OptionType::String)
    }

    fn from_options(options: &OptionSet) -> Result<Self> {
        let path = options
            .get_str(PATH)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::config(PATH, "must be a non-empty directory path"))?;

        let extension = options
            .get_str(EXTENSION)
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Ok(FileConfig {
            settings: DriverSettings::from_options(options)?,
            path: PathBuf::from(path),
            extension,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct FileEntry {
    key: String,
    value: Value,
    /// Unix time in milliseconds.
    expires_at: Option<u64>,
}

impl FileEntry {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Driver persisting each entry as a file under a directory.
///
/// File names are the sha1 of the raw key bytes, so any string is a valid
/// key and keys differing only in whitespace stay distinct.
pub struct FileDriver {
    config: FileConfig,
    // Serializes read-modify-write sequences on entry files.
    lock: Mutex<()>,
}

impl FileDriver {
    pub fn new(config: FileConfig) -> Self {
        FileDriver {
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.config.path
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha1::digest(key.as_bytes()));
        self.config
            .path
            .join(format!("{}.{}", digest, self.config.extension))
    }

    fn is_entry_file(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext == self.config.extension.as_str())
    }

    fn read_entry(&self, path: &Path) -> Result<Option<FileEntry>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!("⚠ Dropping unreadable cache file {}: {}", path.display(), e);
                remove_if_present(path)?;
                Ok(None)
            }
        }
    }

    /// Live entry for `key`, removing it when expired.
    fn live(&self, key: &str) -> Result<Option<FileEntry>> {
        let path = self.entry_path(key);
        match self.read_entry(&path)? {
            Some(entry) if entry.key != key => Ok(None),
            Some(entry) if entry.is_expired(now_millis()) => {
                remove_if_present(&path)?;
                debug!("File entry {} expired", key);
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl ConfiguredDriver for FileDriver {
    type Config = FileConfig;

    fn from_config(config: FileConfig) -> Self {
        FileDriver::new(config)
    }
}

impl CacheDriver for FileDriver {
    fn initialize(&mut self) -> Result<()> {
        fs::create_dir_all(&self.config.path).map_err(|e| {
            Error::BackendError(format!(
                "Failed to create cache directory {}: {}",
                self.config.path.display(),
                e
            ))
        })?;

        if !fs::metadata(&self.config.path)?.is_dir() {
            return Err(Error::BackendError(format!(
                "Cache path {} is not a directory",
                self.config.path.display()
            )));
        }

        info!(
            "✓ File driver initialized at {} (extension: .{})",
            self.config.path.display(),
            self.config.extension
        );
        Ok(())
    }

    fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        let _guard = self.lock.lock();
        match self.live(key)? {
            Some(entry) => {
                debug!("✓ File GET {} -> HIT", key);
                Ok(entry.value)
            }
            None => {
                debug!("✓ File GET {} -> MISS", key);
                Ok(default.unwrap_or(Value::Null))
            }
        }
    }

    fn set(&self, key: &str, value: Value, lifetime: Option<u64>) -> Result<bool> {
        let ttl = self.config.settings.ttl(lifetime);
        let entry = FileEntry {
            key: key.to_string(),
            value,
            expires_at: ttl.map(|d| {
                now_millis().saturating_add(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            }),
        };
        let bytes = serde_json::to_vec(&entry)?;

        let path = self.entry_path(key);
        let staging = path.with_extension(format!("{}.tmp", self.config.extension));

        let _guard = self.lock.lock();
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;

        debug!("✓ File SET {} (TTL: {:?})", key, ttl);
        Ok(true)
    }

    fn has(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        Ok(self.live(key)?.is_some())
    }

    fn forget(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        if self.live(key)?.is_none() {
            return Ok(false);
        }

        let removed = remove_if_present(&self.entry_path(key))?;
        debug!("✓ File FORGET {}", key);
        Ok(removed)
    }

    fn purge(&self, expired: bool) -> Result<bool> {
        let _guard = self.lock.lock();
        let now = now_millis();
        let mut removed = 0usize;

        for dir_entry in fs::read_dir(&self.config.path)? {
            let path = dir_entry?.path();
            if !self.is_entry_file(&path) {
                continue;
            }

            let stale = if expired {
                match self.read_entry(&path)? {
                    Some(entry) => entry.is_expired(now),
                    // Unreadable entries were already dropped by read_entry
                    None => false,
                }
            } else {
                true
            };

            if stale && remove_if_present(&path)? {
                removed += 1;
            }
        }

        if expired {
            debug!("✓ File PURGE expired ({} removed)", removed);
        } else {
            warn!(
                "⚠ File PURGE executed - {} entries cleared from {}",
                removed,
                self.config.path.display()
            );
        }
        Ok(true)
    }
}
