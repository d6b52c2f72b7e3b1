//! Redis cache driver.

use super::{CacheDriver, ConfiguredDriver, DriverSettings};
use crate::error::{Error, Result};
use crate::options::{DriverConfig, OptionSchema, OptionSet, OptionType};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use std::time::Duration;

pub const HOST: &str = "host";
pub const PORT: &str = "port";
/// Connect timeout in seconds.
pub const TIMEOUT: &str = "timeout";
pub const PASSWORD: &str = "password";
pub const DB: &str = "db";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for Redis driver.
#[derive(Clone, Debug, PartialEq)]
pub struct RedisConfig {
    pub settings: DriverSettings,
    pub host: String,
    pub port: u16,
    pub connection_timeout: Duration,
    pub password: Option<String>,
    pub db: Option<i64>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            settings: DriverSettings::default(),
            host: "localhost".to_string(),
            port: 6379,
            connection_timeout: DEFAULT_TIMEOUT,
            password: None,
            db: None,
        }
    }
}

impl RedisConfig {
    fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

impl DriverConfig for RedisConfig {
    fn schema() -> OptionSchema {
        DriverSettings::schema()
            .required(HOST, OptionType::String)
            .required(PORT, OptionType::Int)
            .optional(TIMEOUT, OptionType::Float)
            .optional(PASSWORD, OptionType::String)
            .optional(DB, OptionType::Int)
    }

    fn from_options(options: &OptionSet) -> Result<Self> {
        let host = options
            .get_str(HOST)
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config(HOST, "must be a non-empty host name"))?
            .to_string();

        let port = options
            .get_u64(PORT)?
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| Error::config(PORT, "must be a port number between 0 and 65535"))?;

        let connection_timeout = match options.get_float(TIMEOUT) {
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
            Some(secs) => {
                return Err(Error::config(
                    TIMEOUT,
                    format!("must be a positive number of seconds, got {}", secs),
                ))
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(RedisConfig {
            settings: DriverSettings::from_options(options)?,
            host,
            port,
            connection_timeout,
            password: options.get_str(PASSWORD).map(str::to_string),
            db: options.get_int(DB),
        })
    }
}

/// Redis driver over a single synchronous connection.
///
/// Values are stored JSON-encoded. Redis expires keys itself, so
/// `purge(true)` has nothing to sweep; `purge(false)` flushes the selected db.
///
/// A connection built elsewhere can be handed in with
/// [`with_connection`](Self::with_connection); `initialize` then uses it as is
/// and skips connect, AUTH and SELECT.
pub struct RedisDriver {
    config: RedisConfig,
    connection: Option<Mutex<redis::Connection>>,
}

impl RedisDriver {
    pub fn new(config: RedisConfig) -> Self {
        RedisDriver {
            config,
            connection: None,
        }
    }

    /// Driver over an already established connection.
    pub fn with_connection(config: RedisConfig, connection: redis::Connection) -> Self {
        RedisDriver {
            config,
            connection: Some(Mutex::new(connection)),
        }
    }

    /// Replace the connection; later calls go through `connection`.
    pub fn set_connection(&mut self, connection: redis::Connection) {
        self.connection = Some(Mutex::new(connection));
    }

    /// The underlying connection, once initialized or injected.
    pub fn connection(&self) -> Option<MutexGuard<'_, redis::Connection>> {
        self.connection.as_ref().map(Mutex::lock)
    }

    fn conn(&self) -> Result<MutexGuard<'_, redis::Connection>> {
        self.connection
            .as_ref()
            .map(Mutex::lock)
            .ok_or_else(|| Error::InvalidState("Redis driver is not initialized".to_string()))
    }
}

impl ConfiguredDriver for RedisDriver {
    type Config = RedisConfig;

    fn from_config(config: RedisConfig) -> Self {
        RedisDriver::new(config)
    }
}

impl CacheDriver for RedisDriver {
    fn initialize(&mut self) -> Result<()> {
        if self.connection.is_some() {
            info!(
                "✓ Redis driver initialized with injected connection to {}:{}",
                self.config.host, self.config.port
            );
            return Ok(());
        }

        let client = redis::Client::open(self.config.url())?;
        let mut conn = client
            .get_connection_with_timeout(self.config.connection_timeout)
            .map_err(|e| {
                Error::BackendError(format!(
                    "Unable to connect to redis at {}:{}: {}",
                    self.config.host, self.config.port, e
                ))
            })?;

        conn.set_read_timeout(Some(self.config.connection_timeout))?;
        conn.set_write_timeout(Some(self.config.connection_timeout))?;

        if let Some(password) = &self.config.password {
            redis::cmd("AUTH")
                .arg(password)
                .query::<()>(&mut conn)
                .map_err(|e| Error::BackendError(format!("Redis auth not successful: {}", e)))?;
        }

        if let Some(db) = self.config.db {
            redis::cmd("SELECT")
                .arg(db)
                .query::<()>(&mut conn)
                .map_err(|e| {
                    Error::BackendError(format!("Redis select db {} not successful: {}", db, e))
                })?;
        }

        info!(
            "✓ Redis driver initialized with server: {}:{} (db: {})",
            self.config.host,
            self.config.port,
            self.config.db.unwrap_or(0)
        );

        self.connection = Some(Mutex::new(conn));
        Ok(())
    }

    fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        let raw: Option<String> = redis::cmd("GET")
            .arg(key)
            .query(&mut *self.conn()?)
            .map_err(|e| Error::BackendError(format!("Redis GET failed for key {}: {}", key, e)))?;

        match raw {
            Some(raw) => {
                debug!("✓ Redis GET {} -> HIT", key);
                Ok(serde_json::from_str(&raw)?)
            }
            None => {
                debug!("✓ Redis GET {} -> MISS", key);
                Ok(default.unwrap_or(Value::Null))
            }
        }
    }

    fn set(&self, key: &str, value: Value, lifetime: Option<u64>) -> Result<bool> {
        let payload = serde_json::to_string(&value)?;
        let ttl = self.config.settings.ttl(lifetime);

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(payload);
        if let Some(d) = ttl {
            cmd.arg("EX").arg(d.as_secs());
        }

        let reply: Option<String> = cmd
            .query(&mut *self.conn()?)
            .map_err(|e| Error::BackendError(format!("Redis SET failed for key {}: {}", key, e)))?;

        debug!("✓ Redis SET {} (TTL: {:?})", key, ttl);
        Ok(reply.as_deref() == Some("OK"))
    }

    fn has(&self, key: &str) -> Result<bool> {
        let count: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query(&mut *self.conn()?)
            .map_err(|e| {
                Error::BackendError(format!("Redis EXISTS check failed for key {}: {}", key, e))
            })?;
        Ok(count > 0)
    }

    fn forget(&self, key: &str) -> Result<bool> {
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query(&mut *self.conn()?)
            .map_err(|e| Error::BackendError(format!("Redis DEL failed for key {}: {}", key, e)))?;

        debug!("✓ Redis DEL {} (removed: {})", key, removed);
        Ok(removed > 0)
    }

    fn purge(&self, expired: bool) -> Result<bool> {
        if expired {
            debug!("Redis expires keys server-side, nothing to sweep");
            return Ok(true);
        }

        redis::cmd("FLUSHDB")
            .query::<()>(&mut *self.conn()?)
            .map_err(|e| Error::BackendError(format!("Redis FLUSHDB failed: {}", e)))?;

        warn!("⚠ Redis FLUSHDB executed - all cache cleared!");
        Ok(true)
    }
}
