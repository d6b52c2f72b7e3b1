//! Cache service - the object an application builds once and shares.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::factory::{DriverDescriptor, DriverFactory};
use crate::instance::CacheInstance;
use crate::options::OptionMap;
use crate::registry::InstanceRegistry;
use serde_json::Value;
use std::sync::Arc;

/// Registry, factory and dispatcher wired together.
///
/// Build one at startup, register any extra drivers, then share it
/// (`Arc<Cache>`) with everything that needs cache access.
///
/// # Example
///
/// ```
/// use cache_registry::Cache;
/// use serde_json::json;
///
/// let cache = Cache::new();
/// let options = json!({ "default_expiration": 300 });
/// cache.create("memory", options.as_object().expect("object"), Some("primary"))?;
///
/// cache.call(&[json!("primary"), json!("set"), json!("user:1"), json!("Ada")])?;
/// assert_eq!(cache.call(&[json!("get"), json!("user:1")])?, json!("Ada"));
///
/// cache.shutdown()?;
/// # Ok::<(), cache_registry::Error>(())
/// ```
pub struct Cache {
    registry: Arc<InstanceRegistry>,
    factory: DriverFactory,
    dispatcher: Dispatcher,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Cache with the built-in drivers registered.
    pub fn new() -> Self {
        let registry = Arc::new(InstanceRegistry::new());
        Cache::from_factory(DriverFactory::with_builtin_drivers(registry))
    }

    /// Cache around an existing factory and its registry.
    pub fn from_factory(factory: DriverFactory) -> Self {
        let registry = factory.registry().clone();
        Cache {
            dispatcher: Dispatcher::new(registry.clone()),
            registry,
            factory,
        }
    }

    pub fn register_driver(&mut self, name: &str, descriptor: DriverDescriptor) {
        self.factory.register_driver(name, descriptor);
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &DriverFactory {
        &self.factory
    }

    /// See [`DriverFactory::create`].
    pub fn create(
        &self,
        driver: &str,
        options: &OptionMap,
        namespace: Option<&str>,
    ) -> Result<Arc<CacheInstance>> {
        self.factory.create(driver, options, namespace)
    }

    /// Instance under `namespace`, or the default when `None`.
    pub fn instance(&self, namespace: Option<&str>) -> Result<Arc<CacheInstance>> {
        match namespace {
            Some(ns) => self.registry.get(ns),
            None => self.registry.get_default(),
        }
    }

    /// Instance under `namespace`, creating it with `driver` and `options`
    /// if it is not registered yet.
    pub fn instance_or_create(
        &self,
        namespace: &str,
        driver: &str,
        options: &OptionMap,
    ) -> Result<Arc<CacheInstance>> {
        if let Some(existing) = self.registry.find(namespace) {
            return Ok(existing);
        }
        self.factory.create(driver, options, Some(namespace))
    }

    pub fn has_instance(&self, namespace: Option<&str>) -> bool {
        self.registry.has(namespace)
    }

    /// See [`Dispatcher::call`].
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.dispatcher.call(args)
    }

    /// See [`crate::hash::hash`].
    pub fn hash(&self, input: &str, algorithm: &str) -> Result<String> {
        crate::hash::hash(input, algorithm)
    }

    /// Tear down every registered instance. See [`InstanceRegistry::shutdown`].
    pub fn shutdown(&self) -> Result<()> {
        self.registry.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn memory_options() -> OptionMap {
        json!({ "default_expiration": 60 })
            .as_object()
            .cloned()
            .expect("object")
    }

    #[test]
    fn test_instance_lookup() {
        let cache = Cache::new();
        assert!(matches!(cache.instance(None), Err(Error::NoInstance)));
        assert!(!cache.has_instance(None));

        let primary = cache
            .create("memory", &memory_options(), Some("primary"))
            .expect("Failed to create");

        assert!(Arc::ptr_eq(&cache.instance(None).expect("default"), &primary));
        assert!(Arc::ptr_eq(
            &cache.instance(Some("primary")).expect("primary"),
            &primary
        ));
        assert!(matches!(
            cache.instance(Some("secondary")),
            Err(Error::InstanceNotFound(_))
        ));
    }

    #[test]
    fn test_instance_or_create_reuses_existing() {
        let cache = Cache::new();

        let first = cache
            .instance_or_create("sessions", "memory", &memory_options())
            .expect("Failed to create");
        let again = cache
            .instance_or_create("sessions", "memory", &memory_options())
            .expect("Failed to get");

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.registry().len(), 1);
    }

    #[test]
    fn test_hash_passthrough() {
        let cache = Cache::new();
        assert_eq!(
            cache.hash("abc", "sha1").expect("sha1"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_shutdown_empties_registry() {
        let cache = Cache::new();
        let instance = cache
            .create("memory", &memory_options(), Some("primary"))
            .expect("Failed to create");

        cache.shutdown().expect("Failed to shut down");
        assert!(!cache.has_instance(None));
        assert!(instance.get("k", None).is_err());
    }
}
