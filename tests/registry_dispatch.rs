//! End-to-end behaviour of the cache service across drivers.

use cache_registry::driver::{CacheDriver, MemoryConfig, MemoryDriver};
use cache_registry::options::DriverConfig;
use cache_registry::{
    Cache, DriverDescriptor, Error, LifecycleState, OptionMap, OptionSchema, OptionType, Value,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn opts(value: Value) -> OptionMap {
    value.as_object().cloned().expect("object")
}

fn temp_dir() -> String {
    std::env::temp_dir()
        .join(format!("cache-registry-it-{}", uuid::Uuid::now_v7()))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_round_trip_through_every_builtin_driver() {
    let _ = env_logger::builder().is_test(true).try_init();

    let cache = Cache::new();
    let dir = temp_dir();

    let memory = cache
        .create("memory", &opts(json!({ "default_expiration": 60 })), Some("mem"))
        .expect("Failed to create memory instance");
    let file = cache
        .create(
            "file",
            &opts(json!({ "path": &dir, "default_expiration": 60 })),
            Some("disk"),
        )
        .expect("Failed to create file instance");

    for instance in [&memory, &file] {
        assert!(instance.set("k", json!(42), Some(60)).expect("set"));
        assert_eq!(instance.get("k", None).expect("get"), json!(42));
        assert!(instance.forget("k").expect("forget"));
        assert!(!instance.has("k").expect("has"));
        assert_eq!(
            instance.get("k", Some(json!("fallback"))).expect("get"),
            json!("fallback")
        );
    }

    cache.shutdown().expect("Failed to shut down");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_default_follows_newest_instance() {
    let cache = Cache::new();
    let options = opts(json!({ "default_expiration": 60 }));

    let primary = cache
        .create("memory", &options, Some("primary"))
        .expect("Failed to create");
    let newest = cache
        .create("memory", &options, None)
        .expect("Failed to create");

    cache
        .call(&[json!("primary"), json!("set"), json!("k"), json!("p")])
        .expect("namespaced call");
    cache
        .call(&[json!("set"), json!("k"), json!("d")])
        .expect("default call");

    assert_eq!(primary.get("k", None).expect("get"), json!("p"));
    assert_eq!(newest.get("k", None).expect("get"), json!("d"));
    assert!(Arc::ptr_eq(
        &cache.instance(None).expect("default"),
        &newest
    ));
}

#[test]
fn test_purge_twice_is_stable() {
    let cache = Cache::new();
    let instance = cache
        .create("memory", &opts(json!({ "default_expiration": 60 })), None)
        .expect("Failed to create");

    instance.set("a", json!(1), None).expect("set");
    instance.set("b", json!(2), Some(0)).expect("set");

    assert_eq!(cache.call(&[json!("purge"), json!(true)]).expect("purge"), json!(true));
    let after_first = (instance.has("a").expect("has"), instance.has("b").expect("has"));
    assert_eq!(cache.call(&[json!("purge"), json!(true)]).expect("purge"), json!(true));
    let after_second = (instance.has("a").expect("has"), instance.has("b").expect("has"));

    assert_eq!(after_first, (true, true));
    assert_eq!(after_first, after_second);
}

/// Memory driver wrapper that counts purges, registered as an external driver.
struct CountingDriver {
    inner: MemoryDriver,
    purges: Arc<AtomicUsize>,
}

impl CacheDriver for CountingDriver {
    fn initialize(&mut self) -> cache_registry::Result<()> {
        self.inner.initialize()
    }

    fn get(&self, key: &str, default: Option<Value>) -> cache_registry::Result<Value> {
        self.inner.get(key, default)
    }

    fn set(&self, key: &str, value: Value, lifetime: Option<u64>) -> cache_registry::Result<bool> {
        self.inner.set(key, value, lifetime)
    }

    fn has(&self, key: &str) -> cache_registry::Result<bool> {
        self.inner.has(key)
    }

    fn forget(&self, key: &str) -> cache_registry::Result<bool> {
        self.inner.forget(key)
    }

    fn purge(&self, expired: bool) -> cache_registry::Result<bool> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        self.inner.purge(expired)
    }
}

#[test]
fn test_external_driver_with_autopurge_teardown() {
    let purges = Arc::new(AtomicUsize::new(0));
    let counter = purges.clone();

    let mut cache = Cache::new();
    cache.register_driver(
        "counting",
        DriverDescriptor::new(
            MemoryConfig::schema().optional("label", OptionType::String),
            move |options| {
                Ok(Box::new(CountingDriver {
                    inner: MemoryDriver::new(MemoryConfig::from_options(options)?),
                    purges: counter.clone(),
                }) as Box<dyn CacheDriver>)
            },
        ),
    );

    let instance = cache
        .create(
            "counting",
            &opts(json!({ "default_expiration": 60, "autopurge_expired": true, "label": "x" })),
            Some("a"),
        )
        .expect("Failed to create");
    cache.registry().register("b", instance.clone());

    cache.shutdown().expect("Failed to shut down");
    cache.shutdown().expect("Second shutdown is a no-op");

    assert_eq!(instance.state(), LifecycleState::TornDown);
    assert_eq!(purges.load(Ordering::SeqCst), 1);
}

#[test]
fn test_error_kinds_surface_to_caller() {
    let cache = Cache::new();

    assert!(matches!(
        cache.create("apc", &OptionMap::new(), None),
        Err(Error::DriverNotFound(_))
    ));
    assert!(matches!(
        cache.create("file", &opts(json!({ "default_expiration": 60 })), None),
        Err(Error::ConfigError { ref key, .. }) if key == "path"
    ));
    assert!(matches!(
        cache.call(&[json!("get"), json!("k")]),
        Err(Error::NoInstance)
    ));

    cache
        .create("memory", &opts(json!({ "default_expiration": 60 })), None)
        .expect("Failed to create");
    assert!(matches!(
        cache.call(&[json!("explode")]),
        Err(Error::DispatchError(_))
    ));
    assert!(matches!(
        cache.instance(Some("nope")),
        Err(Error::InstanceNotFound(_))
    ));
}

#[test]
fn test_schema_only_declares_what_it_checks() {
    let schema = OptionSchema::new().required("host", OptionType::String);
    let set = schema
        .validate(&opts(json!({ "host": "h", "extra": [1, 2] })))
        .expect("valid");
    assert_eq!(set.len(), 1);
}
