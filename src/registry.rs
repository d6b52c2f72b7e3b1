//! Namespace → instance registry with a default instance pointer.

use crate::error::{Error, Result};
use crate::instance::CacheInstance;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct RegistryState {
    instances: HashMap<String, Arc<CacheInstance>>,
    default: Option<Arc<CacheInstance>>,
}

/// Registry of named cache instances plus the current default.
///
/// One lock guards both the map and the default pointer. The registry is an
/// ordinary value: the application owns it (usually behind an `Arc`) and
/// hands it to whatever needs to resolve instances.
///
/// # Example
///
/// ```
/// # use cache_registry::driver::{MemoryConfig, MemoryDriver};
/// # use cache_registry::{CacheInstance, InstanceRegistry};
/// # use std::sync::Arc;
/// let mut instance = CacheInstance::new("memory", Box::new(MemoryDriver::new(MemoryConfig::default())), false);
/// instance.initialize()?;
/// let instance = instance.serve()?;
///
/// let registry = InstanceRegistry::new();
/// registry.register(" sessions ", instance.clone());
/// assert!(Arc::ptr_eq(&registry.get("sessions")?, &instance));
/// # Ok::<(), cache_registry::Error>(())
/// ```
#[derive(Default)]
pub struct InstanceRegistry {
    state: RwLock<RegistryState>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `instance` under the trimmed `namespace`, replacing any previous entry.
    pub fn register(&self, namespace: &str, instance: Arc<CacheInstance>) {
        let namespace = namespace.trim();
        let previous = self
            .state
            .write()
            .instances
            .insert(namespace.to_string(), instance);

        if previous.is_some() {
            warn!("⚠ Cache namespace '{}' re-registered, previous instance replaced", namespace);
        } else {
            debug!("✓ Cache namespace '{}' registered", namespace);
        }
    }

    /// Make `instance` the default.
    pub fn set_default(&self, instance: Arc<CacheInstance>) {
        self.state.write().default = Some(instance);
    }

    /// Set the default and, when `namespace` is given, register under it,
    /// both under a single lock acquisition.
    pub(crate) fn install(&self, namespace: Option<&str>, instance: Arc<CacheInstance>) {
        let mut state = self.state.write();
        if let Some(ns) = namespace.map(str::trim) {
            if state
                .instances
                .insert(ns.to_string(), instance.clone())
                .is_some()
            {
                warn!("⚠ Cache namespace '{}' re-registered, previous instance replaced", ns);
            }
        }
        state.default = Some(instance);
    }

    /// Instance registered under `namespace`.
    ///
    /// # Errors
    ///
    /// `Error::InstanceNotFound` if nothing is registered under it.
    pub fn get(&self, namespace: &str) -> Result<Arc<CacheInstance>> {
        self.find(namespace)
            .ok_or_else(|| Error::InstanceNotFound(namespace.trim().to_string()))
    }

    pub(crate) fn find(&self, namespace: &str) -> Option<Arc<CacheInstance>> {
        self.find_exact(namespace.trim())
    }

    /// Lookup without trimming; `" primary "` does not match `primary`.
    pub(crate) fn find_exact(&self, namespace: &str) -> Option<Arc<CacheInstance>> {
        self.state.read().instances.get(namespace).cloned()
    }

    /// The most recently constructed instance.
    ///
    /// # Errors
    ///
    /// `Error::NoInstance` if no default has been set.
    pub fn get_default(&self) -> Result<Arc<CacheInstance>> {
        self.state.read().default.clone().ok_or(Error::NoInstance)
    }

    /// With a namespace, whether it is registered; without, whether a default exists.
    pub fn has(&self, namespace: Option<&str>) -> bool {
        let state = self.state.read();
        match namespace {
            Some(ns) => state.instances.contains_key(ns.trim()),
            None => state.default.is_some(),
        }
    }

    /// Unregister `namespace`. The instance is neither torn down nor
    /// removed as default.
    pub fn remove(&self, namespace: &str) -> Option<Arc<CacheInstance>> {
        self.state.write().instances.remove(namespace.trim())
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().instances.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.state.read().instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().instances.is_empty()
    }

    /// Empty the registry and tear down every distinct instance it held.
    ///
    /// Each instance is torn down at most once even if it sat under several
    /// namespaces and as the default. All instances are attempted.
    ///
    /// # Errors
    ///
    /// The first teardown failure, after the rest have run.
    pub fn shutdown(&self) -> Result<()> {
        let drained: Vec<Arc<CacheInstance>> = {
            let mut state = self.state.write();
            let mut all: Vec<_> = state.instances.drain().map(|(_, i)| i).collect();
            all.extend(state.default.take());
            all
        };

        let mut distinct: Vec<Arc<CacheInstance>> = Vec::with_capacity(drained.len());
        for instance in drained {
            if !distinct.iter().any(|seen| Arc::ptr_eq(seen, &instance)) {
                distinct.push(instance);
            }
        }

        info!("Shutting down cache registry ({} instances)", distinct.len());

        let mut first_error = None;
        for instance in distinct {
            if let Err(e) = instance.teardown() {
                warn!(
                    "⚠ Teardown of '{}' instance failed: {}",
                    instance.driver_name(),
                    e
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
