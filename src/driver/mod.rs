//! Driver contract and built-in backing-store drivers.

pub mod file;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use file::{FileConfig, FileDriver};
pub use memory::{MemoryConfig, MemoryDriver};
#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisDriver};

use crate::error::{Error, Result};
use crate::options::{DriverConfig, OptionSchema, OptionSet, OptionType};
use serde_json::Value;
use std::time::Duration;

/// Option key: expiration in seconds applied when `set` is called without a lifetime.
pub const DEFAULT_EXPIRATION: &str = "default_expiration";

/// Option key: purge expired entries when the instance is torn down.
pub const AUTOPURGE_EXPIRED: &str = "autopurge_expired";

/// Contract every backing-store driver implements.
///
/// Drivers are shared between threads once registered, so each one guards
/// its own store (a map needs its own lock; a network client may already
/// be safe to share).
///
/// Lifetimes are whole seconds. `Some(0)` never expires; `None` applies the
/// driver's default expiration.
pub trait CacheDriver: Send + Sync {
    /// Connect to or prepare the backing store. Called exactly once, before
    /// any other method.
    fn initialize(&mut self) -> Result<()>;

    /// Stored value for `key` if present and unexpired, else `default`
    /// (or `Value::Null` when no default is given).
    fn get(&self, key: &str, default: Option<Value>) -> Result<Value>;

    /// Store `value` under `key`. Returns whether the write succeeded.
    fn set(&self, key: &str, value: Value, lifetime: Option<u64>) -> Result<bool>;

    /// Whether an unexpired entry exists for `key`.
    fn has(&self, key: &str) -> Result<bool>;

    /// Remove `key`. Returns `false` if it did not exist.
    fn forget(&self, key: &str) -> Result<bool>;

    /// Sweep expired entries (`expired == true`) or clear everything.
    fn purge(&self, expired: bool) -> Result<bool>;
}

/// A driver type that is built from a typed config.
pub trait ConfiguredDriver: CacheDriver + Sized + 'static {
    type Config: DriverConfig;

    fn from_config(config: Self::Config) -> Self;
}

/// Options shared by the built-in drivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverSettings {
    /// Seconds; `0` keeps entries until they are removed.
    pub default_expiration: u64,
    pub autopurge_expired: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        DriverSettings {
            default_expiration: 3600,
            autopurge_expired: false,
        }
    }
}

impl DriverSettings {
    /// Resolve a caller lifetime into a time-to-live. `None` means no expiry.
    pub fn ttl(&self, lifetime: Option<u64>) -> Option<Duration> {
        match lifetime.unwrap_or(self.default_expiration) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl DriverConfig for DriverSettings {
    fn schema() -> OptionSchema {
        OptionSchema::new()
            .required(DEFAULT_EXPIRATION, OptionType::Int)
            .optional(AUTOPURGE_EXPIRED, OptionType::Bool)
    }

    fn from_options(options: &OptionSet) -> Result<Self> {
        let default_expiration = options
            .get_u64(DEFAULT_EXPIRATION)?
            .ok_or_else(|| Error::config(DEFAULT_EXPIRATION, "required option is missing"))?;

        Ok(DriverSettings {
            default_expiration,
            autopurge_expired: options.get_bool(AUTOPURGE_EXPIRED).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ttl_resolution() {
        let settings = DriverSettings {
            default_expiration: 60,
            autopurge_expired: false,
        };

        assert_eq!(settings.ttl(None), Some(Duration::from_secs(60)));
        assert_eq!(settings.ttl(Some(5)), Some(Duration::from_secs(5)));
        assert_eq!(settings.ttl(Some(0)), None);

        let forever = DriverSettings {
            default_expiration: 0,
            ..settings
        };
        assert_eq!(forever.ttl(None), None);
    }

    #[test]
    fn test_settings_from_options() {
        let map = json!({ "default_expiration": 120, "autopurge_expired": true });
        let set = DriverSettings::schema()
            .validate(map.as_object().expect("object"))
            .expect("valid options");

        let settings = DriverSettings::from_options(&set).expect("valid settings");
        assert_eq!(settings.default_expiration, 120);
        assert!(settings.autopurge_expired);
    }

    #[test]
    fn test_default_expiration_is_required() {
        let map = json!({ "autopurge_expired": true });
        let err = DriverSettings::schema()
            .validate(map.as_object().expect("object"))
            .unwrap_err();

        assert!(matches!(err, Error::ConfigError { ref key, .. } if key == DEFAULT_EXPIRATION));
    }
}
