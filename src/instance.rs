//! A driver bound to its lifecycle and dispatch table.

use crate::dispatch::DispatchTable;
use crate::driver::CacheDriver;
use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of a [`CacheInstance`].
///
/// `Uninitialized → Initialized → Serving → TornDown`. Teardown may also
/// happen straight from `Initialized`; no state is ever left twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    Initialized = 1,
    Serving = 2,
    TornDown = 3,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Initialized,
            2 => LifecycleState::Serving,
            _ => LifecycleState::TornDown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Serving => "serving",
            LifecycleState::TornDown => "torn_down",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A constructed driver together with its lifecycle state.
///
/// Instances are created by the factory and shared as `Arc<CacheInstance>`;
/// two handles refer to the same instance iff `Arc::ptr_eq` holds.
pub struct CacheInstance {
    driver_name: String,
    driver: Box<dyn CacheDriver>,
    autopurge_expired: bool,
    state: AtomicU8,
    operations: DispatchTable,
}

impl CacheInstance {
    pub fn new(
        driver_name: impl Into<String>,
        driver: Box<dyn CacheDriver>,
        autopurge_expired: bool,
    ) -> Self {
        CacheInstance {
            driver_name: driver_name.into(),
            driver,
            autopurge_expired,
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
            operations: DispatchTable::empty(),
        }
    }

    /// Run the driver's initialization hook.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` if the instance was already initialized, or the
    /// driver's own error if its hook fails (the state is left unchanged).
    pub fn initialize(&mut self) -> Result<()> {
        let state = self.state.get_mut();
        if *state != LifecycleState::Uninitialized as u8 {
            return Err(Error::InvalidState(format!(
                "'{}' instance cannot be initialized twice",
                self.driver_name
            )));
        }

        self.driver.initialize()?;
        *self.state.get_mut() = LifecycleState::Initialized as u8;
        Ok(())
    }

    /// Start serving and share the instance. The dispatch table is bound here.
    pub fn serve(mut self) -> Result<Arc<Self>> {
        let state = self.state();
        if state != LifecycleState::Initialized {
            return Err(Error::InvalidState(format!(
                "'{}' instance must be initialized before serving (state: {})",
                self.driver_name, state
            )));
        }

        self.operations = DispatchTable::standard();
        *self.state.get_mut() = LifecycleState::Serving as u8;
        Ok(Arc::new(self))
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn autopurge_expired(&self) -> bool {
        self.autopurge_expired
    }

    fn serving(&self) -> Result<&dyn CacheDriver> {
        match self.state() {
            LifecycleState::Serving => Ok(self.driver.as_ref()),
            state => Err(Error::InvalidState(format!(
                "'{}' instance is not serving (state: {})",
                self.driver_name, state
            ))),
        }
    }

    /// Value for `key`, or `default` (`Value::Null` if none) when absent or expired.
    pub fn get(&self, key: &str, default: Option<Value>) -> Result<Value> {
        self.serving()?.get(key, default)
    }

    /// Store `value`; `None` lifetime applies the driver's default expiration.
    pub fn set(&self, key: &str, value: Value, lifetime: Option<u64>) -> Result<bool> {
        self.serving()?.set(key, value, lifetime)
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.serving()?.has(key)
    }

    pub fn forget(&self, key: &str) -> Result<bool> {
        self.serving()?.forget(key)
    }

    pub fn purge(&self, expired: bool) -> Result<bool> {
        self.serving()?.purge(expired)
    }

    /// Invoke the operation registered under `operation` with `params`.
    ///
    /// # Errors
    ///
    /// `Error::DispatchError` if the operation is unknown or the parameters
    /// do not fit it, otherwise whatever the operation returns.
    pub fn dispatch(&self, operation: &str, params: &[Value]) -> Result<Value> {
        let op = self.operations.lookup(operation).ok_or_else(|| {
            Error::DispatchError(format!(
                "'{}' driver has no operation '{}'",
                self.driver_name, operation
            ))
        })?;
        op(self, params)
    }

    /// Names of the operations [`dispatch`](Self::dispatch) accepts.
    pub fn operations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.names()
    }

    /// Tear the instance down, purging expired entries first when
    /// `autopurge_expired` is set.
    ///
    /// Runs at most once: later calls return `Ok(false)`. A failed purge is
    /// reported but the instance stays torn down.
    pub fn teardown(&self) -> Result<bool> {
        let previous = self
            .state
            .swap(LifecycleState::TornDown as u8, Ordering::AcqRel);
        let previous = LifecycleState::from_u8(previous);

        if previous == LifecycleState::TornDown {
            return Ok(false);
        }

        if self.autopurge_expired && previous != LifecycleState::Uninitialized {
            if let Err(e) = self.driver.purge(true) {
                warn!(
                    "⚠ Auto-purge failed while tearing down '{}' instance: {}",
                    self.driver_name, e
                );
                return Err(e);
            }
        }

        info!("✓ '{}' instance torn down", self.driver_name);
        Ok(true)
    }
}

impl fmt::Debug for CacheInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheInstance")
            .field("driver_name", &self.driver_name)
            .field("autopurge_expired", &self.autopurge_expired)
            .field("state", &self.state())
            .finish()
    }
}
