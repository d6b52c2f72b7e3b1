//! In-memory cache driver.

use super::{CacheDriver, ConfiguredDriver, DriverSettings};
use crate::error::Result;
use crate::options::{DriverConfig, OptionSchema, OptionSet, OptionType};
use dashmap::DashMap;
use serde_json::Value;
use std::time::Instant;

/// Option key: initial capacity of the map.
pub const CAPACITY: &str = "capacity";

/// Configuration for [`MemoryDriver`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryConfig {
    pub settings: DriverSettings,
    pub capacity: usize,
}

impl DriverConfig for MemoryConfig {
    fn schema() -> OptionSchema {
        DriverSettings::schema().optional(CAPACITY, OptionType::Int)
    }

    fn from_options(options: &OptionSet) -> Result<Self> {
        Ok(MemoryConfig {
            settings: DriverSettings::from_options(options)?,
            capacity: options.get_u64(CAPACITY)?.unwrap_or(0) as usize,
        })
    }
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local driver backed by a concurrent map.
///
/// Expired entries are dropped lazily on access and eagerly by `purge(true)`.
///
/// # Example
///
/// ```
/// # use cache_registry::driver::{CacheDriver, MemoryConfig, MemoryDriver};
/// # use serde_json::json;
/// let mut driver = MemoryDriver::new(MemoryConfig::default());
/// driver.initialize()?;
/// driver.set("answer", json!(42), Some(60))?;
/// assert_eq!(driver.get("answer", None)?, json!(42));
/// # Ok::<(), cache_registry::Error>(())
/// ```
pub struct MemoryDriver {
    config: MemoryConfig,
    store: DashMap<String, Entry>,
}

impl MemoryDriver {
    pub fn new(config: MemoryConfig) -> Self {
        let store = DashMap::with_capacity(config.capacity);
        MemoryDriver { config, store }
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn live(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        match self.store.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        self.store.remove_if(key, |_, entry| entry.is_expired(now));
        debug!("Memory entry {} expired", key);
        None
    }
}

impl ConfiguredDriver for MemoryDriver {
    type Config = MemoryConfig;

    fn from_config(config: MemoryConfig) -> Self {
        MemoryDriver::new(config)
    }
}

impl CacheDriver for MemoryDriver {
    fn initialize(&mut self) -> Result<()> {
        info!(
            "✓ Memory driver initialized (default expiration: {}s)",
            self.config.settings.default_expiration
        );
        Ok(())
    }

    fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        match self.live(key) {
            Some(value) => {
                debug!("✓ Memory GET {} -> HIT", key);
                Ok(value)
            }
            None => {
                debug!("✓ Memory GET {} -> MISS", key);
                Ok(default.unwrap_or(Value::Null))
            }
        }
    }

    fn set(&self, key: &str, value: Value, lifetime: Option<u64>) -> Result<bool> {
        let ttl = self.config.settings.ttl(lifetime);
        // A deadline past what `Instant` can represent never arrives
        let expires_at = ttl.and_then(|d| Instant::now().checked_add(d));

        self.store
            .insert(key.to_string(), Entry { value, expires_at });

        debug!("✓ Memory SET {} (TTL: {:?})", key, ttl);
        Ok(true)
    }

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.live(key).is_some())
    }

    fn forget(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let existed = self
            .store
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now));

        debug!("✓ Memory FORGET {} (existed: {})", key, existed);
        Ok(existed)
    }

    fn purge(&self, expired: bool) -> Result<bool> {
        if expired {
            let now = Instant::now();
            let before = self.store.len();
            self.store.retain(|_, entry| !entry.is_expired(now));
            debug!(
                "✓ Memory PURGE expired ({} removed)",
                before.saturating_sub(self.store.len())
            );
        } else {
            self.store.clear();
            warn!("⚠ Memory PURGE executed - all entries cleared!");
        }
        Ok(true)
    }
}
