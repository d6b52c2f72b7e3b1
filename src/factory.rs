//! Driver lookup, option validation, construction and registration.

use crate::driver::{CacheDriver, ConfiguredDriver, AUTOPURGE_EXPIRED};
use crate::error::{Error, Result};
use crate::instance::CacheInstance;
use crate::options::{DriverConfig, OptionMap, OptionSchema, OptionSet, OptionType};
use crate::registry::InstanceRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a driver from validated options.
pub type DriverConstructor = Box<dyn Fn(&OptionSet) -> Result<Box<dyn CacheDriver>> + Send + Sync>;

/// What a driver type registers under its name: its options and how to build it.
pub struct DriverDescriptor {
    schema: OptionSchema,
    constructor: DriverConstructor,
}

impl DriverDescriptor {
    pub fn new<F>(schema: OptionSchema, constructor: F) -> Self
    where
        F: Fn(&OptionSet) -> Result<Box<dyn CacheDriver>> + Send + Sync + 'static,
    {
        DriverDescriptor {
            schema,
            constructor: Box::new(constructor),
        }
    }

    /// Descriptor for a driver built from its typed config.
    pub fn of<D: ConfiguredDriver>() -> Self {
        DriverDescriptor::new(D::Config::schema(), |options| {
            let config = D::Config::from_options(options)?;
            Ok(Box::new(D::from_config(config)) as Box<dyn CacheDriver>)
        })
    }

    pub fn schema(&self) -> &OptionSchema {
        &self.schema
    }
}

/// Creates cache instances by driver name and installs them in a registry.
///
/// # Example
///
/// ```
/// # use cache_registry::{DriverFactory, InstanceRegistry};
/// # use serde_json::json;
/// # use std::sync::Arc;
/// let registry = Arc::new(InstanceRegistry::new());
/// let factory = DriverFactory::with_builtin_drivers(registry.clone());
///
/// let options = json!({ "default_expiration": 300 });
/// let sessions = factory.create("memory", options.as_object().expect("object"), Some("sessions"))?;
///
/// assert!(Arc::ptr_eq(&registry.get("sessions")?, &sessions));
/// assert!(Arc::ptr_eq(&registry.get_default()?, &sessions));
/// # Ok::<(), cache_registry::Error>(())
/// ```
pub struct DriverFactory {
    registry: Arc<InstanceRegistry>,
    drivers: HashMap<String, DriverDescriptor>,
}

impl DriverFactory {
    /// Factory with no drivers registered.
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        DriverFactory {
            registry,
            drivers: HashMap::new(),
        }
    }

    /// Factory with `memory`, `file` and, with the `redis` feature, `redis`.
    pub fn with_builtin_drivers(registry: Arc<InstanceRegistry>) -> Self {
        let mut factory = DriverFactory::new(registry);
        factory.register_driver("memory", DriverDescriptor::of::<crate::driver::MemoryDriver>());
        factory.register_driver("file", DriverDescriptor::of::<crate::driver::FileDriver>());
        #[cfg(feature = "redis")]
        factory.register_driver("redis", DriverDescriptor::of::<crate::driver::RedisDriver>());
        factory
    }

    fn normalize(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }

    /// Register a driver under `name` (trimmed, case-insensitive), replacing
    /// an earlier one of the same name.
    ///
    /// The optional `autopurge_expired` bool is added to every schema.
    pub fn register_driver(&mut self, name: &str, descriptor: DriverDescriptor) {
        let DriverDescriptor {
            schema,
            constructor,
        } = descriptor;
        let schema = schema.merge(&OptionSchema::new().optional(AUTOPURGE_EXPIRED, OptionType::Bool));

        let name = Self::normalize(name);
        debug!("Registered cache driver '{}' ({} options)", name, schema.len());
        self.drivers.insert(
            name,
            DriverDescriptor {
                schema,
                constructor,
            },
        );
    }

    pub fn has_driver(&self, name: &str) -> bool {
        self.drivers.contains_key(&Self::normalize(name))
    }

    /// Registered driver names, sorted.
    pub fn driver_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.drivers.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Option schema of a registered driver.
    pub fn schema(&self, name: &str) -> Option<&OptionSchema> {
        self.drivers.get(&Self::normalize(name)).map(DriverDescriptor::schema)
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Construct, initialize and register a new instance of `driver`.
    ///
    /// On success the instance becomes the registry default, and is also
    /// registered under `namespace` when one is given (trimmed, non-empty).
    /// On failure the registry is left untouched.
    ///
    /// # Errors
    ///
    /// - `Error::DriverNotFound`: no driver registered under `driver`
    /// - `Error::ConfigError`: options do not satisfy the driver's schema;
    ///   raised before anything is constructed
    /// - `Error::InitializationError`: the driver's initialization hook
    ///   failed; wraps the cause
    pub fn create(
        &self,
        driver: &str,
        options: &OptionMap,
        namespace: Option<&str>,
    ) -> Result<Arc<CacheInstance>> {
        let name = Self::normalize(driver);
        let descriptor = self
            .drivers
            .get(&name)
            .ok_or_else(|| Error::DriverNotFound(driver.trim().to_string()))?;

        let validated = descriptor.schema.validate(options)?;
        let autopurge = validated.get_bool(AUTOPURGE_EXPIRED).unwrap_or(false);

        let built = (descriptor.constructor)(&validated)?;
        let mut instance = CacheInstance::new(name.clone(), built, autopurge);
        instance
            .initialize()
            .map_err(|e| Error::initialization(name.clone(), e))?;
        let instance = instance.serve()?;

        let namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty());
        self.registry.install(namespace, instance.clone());

        match namespace {
            Some(ns) => info!("✓ Created '{}' cache instance under namespace '{}'", name, ns),
            None => info!("✓ Created '{}' cache instance", name),
        }
        Ok(instance)
    }
}
