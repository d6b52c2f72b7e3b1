//! Generic call surface: resolve an instance, then invoke an operation by name.
//!
//! The first argument selects a namespace when it names a registered one
//! exactly (no trimming) and at least one more argument follows; otherwise the call goes to the
//! default instance. A cache key that happens to equal a namespace name is
//! therefore always read as the namespace.

use crate::error::{Error, Result};
use crate::instance::CacheInstance;
use crate::registry::InstanceRegistry;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// An operation bound by name in a [`DispatchTable`].
pub type OperationFn = fn(&CacheInstance, &[Value]) -> Result<Value>;

/// Operation name → bound function, built once per instance.
#[derive(Clone)]
pub struct DispatchTable {
    operations: HashMap<&'static str, OperationFn>,
}

impl DispatchTable {
    pub fn empty() -> Self {
        DispatchTable {
            operations: HashMap::new(),
        }
    }

    /// Table with the five contract operations.
    pub fn standard() -> Self {
        DispatchTable::empty()
            .with("get", op_get)
            .with("set", op_set)
            .with("has", op_has)
            .with("forget", op_forget)
            .with("purge", op_purge)
    }

    pub fn with(mut self, name: &'static str, op: OperationFn) -> Self {
        self.operations.insert(name, op);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<OperationFn> {
        self.operations.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.keys().copied()
    }
}

fn arity(operation: &str, params: &[Value], min: usize, max: usize) -> Result<()> {
    if params.len() < min || params.len() > max {
        return Err(Error::DispatchError(format!(
            "'{}' takes {} to {} arguments, got {}",
            operation,
            min,
            max,
            params.len()
        )));
    }
    Ok(())
}

fn key_arg<'a>(operation: &str, params: &'a [Value]) -> Result<&'a str> {
    params.first().and_then(Value::as_str).ok_or_else(|| {
        Error::DispatchError(format!("'{}' expects a string key as first argument", operation))
    })
}

fn op_get(instance: &CacheInstance, params: &[Value]) -> Result<Value> {
    arity("get", params, 1, 2)?;
    let key = key_arg("get", params)?;
    instance.get(key, params.get(1).cloned())
}

fn op_set(instance: &CacheInstance, params: &[Value]) -> Result<Value> {
    arity("set", params, 2, 3)?;
    let key = key_arg("set", params)?;
    let lifetime = match params.get(2) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_u64().ok_or_else(|| {
            Error::DispatchError(format!(
                "'set' expects a non-negative integer lifetime, got {}",
                v
            ))
        })?),
    };
    instance.set(key, params[1].clone(), lifetime).map(Value::Bool)
}

fn op_has(instance: &CacheInstance, params: &[Value]) -> Result<Value> {
    arity("has", params, 1, 1)?;
    instance.has(key_arg("has", params)?).map(Value::Bool)
}

fn op_forget(instance: &CacheInstance, params: &[Value]) -> Result<Value> {
    arity("forget", params, 1, 1)?;
    instance.forget(key_arg("forget", params)?).map(Value::Bool)
}

fn op_purge(instance: &CacheInstance, params: &[Value]) -> Result<Value> {
    arity("purge", params, 0, 1)?;
    let expired = match params.first() {
        None => true,
        Some(v) => v.as_bool().ok_or_else(|| {
            Error::DispatchError(format!("'purge' expects a bool argument, got {}", v))
        })?,
    };
    instance.purge(expired).map(Value::Bool)
}

/// Routes generic calls to registry instances.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<InstanceRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Dispatcher { registry }
    }

    /// Resolve the target and invoke the named operation.
    ///
    /// `["primary", "set", "k", "v"]` runs `set("k", "v")` on the instance
    /// registered as `primary`; `["set", "k", "v"]` runs it on the default.
    ///
    /// # Errors
    ///
    /// - `Error::NoInstance`: no namespace matched and there is no default
    /// - `Error::DispatchError`: missing/non-string operation name, unknown
    ///   operation, or unfit parameters
    /// - any error of the operation itself
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let namespaced = match args {
            [Value::String(ns), _, ..] => self.registry.find_exact(ns),
            _ => None,
        };

        let (instance, rest) = match namespaced {
            Some(instance) => {
                debug!("» Dispatch to namespace {:?}", args[0]);
                (instance, &args[1..])
            }
            None => (self.registry.get_default()?, args),
        };

        let (operation, params) = match rest {
            [Value::String(op), params @ ..] => (op.as_str(), params),
            [other, ..] => {
                return Err(Error::DispatchError(format!(
                    "operation name must be a string, got {}",
                    other
                )))
            }
            [] => return Err(Error::DispatchError("no operation given".to_string())),
        };

        debug!(
            "» Dispatch {} with {} argument(s) to '{}' instance",
            operation,
            params.len(),
            instance.driver_name()
        );
        instance.dispatch(operation, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MemoryConfig, MemoryDriver};
    use serde_json::json;

    fn memory() -> Arc<CacheInstance> {
        let driver = MemoryDriver::new(MemoryConfig::default());
        let mut instance = CacheInstance::new("memory", Box::new(driver), false);
        instance.initialize().expect("Failed to initialize");
        instance.serve().expect("Failed to serve")
    }

    fn setup() -> (Arc<InstanceRegistry>, Arc<CacheInstance>, Arc<CacheInstance>) {
        let registry = Arc::new(InstanceRegistry::new());
        let primary = memory();
        let fallback = memory();
        registry.register("primary", primary.clone());
        registry.set_default(fallback.clone());
        (registry, primary, fallback)
    }

    #[test]
    fn test_namespace_routing() {
        let (registry, primary, fallback) = setup();
        let dispatcher = Dispatcher::new(registry);

        let result = dispatcher
            .call(&[json!("primary"), json!("set"), json!("k"), json!("v")])
            .expect("Failed to dispatch");

        assert_eq!(result, json!(true));
        assert_eq!(primary.get("k", None).expect("Failed to get"), json!("v"));
        assert!(!fallback.has("k").expect("Failed to check"));
    }

    #[test]
    fn test_default_routing() {
        let (registry, primary, fallback) = setup();
        let dispatcher = Dispatcher::new(registry);

        dispatcher
            .call(&[json!("set"), json!("k"), json!("v")])
            .expect("Failed to dispatch");

        assert_eq!(fallback.get("k", None).expect("Failed to get"), json!("v"));
        assert!(!primary.has("k").expect("Failed to check"));
        assert_eq!(
            dispatcher
                .call(&[json!("get"), json!("k")])
                .expect("Failed to dispatch"),
            json!("v")
        );
    }

    #[test]
    fn test_full_operation_set() {
        let (registry, _, _) = setup();
        let dispatcher = Dispatcher::new(registry);

        dispatcher
            .call(&[json!("set"), json!("k"), json!(42), json!(60)])
            .expect("Failed to set");
        assert_eq!(
            dispatcher.call(&[json!("has"), json!("k")]).expect("has"),
            json!(true)
        );
        assert_eq!(
            dispatcher.call(&[json!("forget"), json!("k")]).expect("forget"),
            json!(true)
        );
        assert_eq!(
            dispatcher
                .call(&[json!("get"), json!("k"), json!("fallback")])
                .expect("get"),
            json!("fallback")
        );
        assert_eq!(dispatcher.call(&[json!("purge")]).expect("purge"), json!(true));
        assert_eq!(
            dispatcher.call(&[json!("purge"), json!(false)]).expect("purge"),
            json!(true)
        );
    }

    #[test]
    fn test_unknown_operation_is_dispatch_error() {
        let (registry, _, _) = setup();
        let dispatcher = Dispatcher::new(registry);

        let err = dispatcher.call(&[json!("primary"), json!("flush"), json!("k")]);
        assert!(matches!(err, Err(Error::DispatchError(_))));

        let err = dispatcher.call(&[json!("increment"), json!("k")]);
        assert!(matches!(err, Err(Error::DispatchError(_))));
    }

    #[test]
    fn test_bad_arguments_are_dispatch_errors() {
        let (registry, _, _) = setup();
        let dispatcher = Dispatcher::new(registry);

        for args in [
            vec![],
            vec![json!(7), json!("k")],
            vec![json!("get")],
            vec![json!("get"), json!(1)],
            vec![json!("set"), json!("k"), json!("v"), json!(-5)],
            vec![json!("has"), json!("a"), json!("b")],
            vec![json!("purge"), json!("yes")],
        ] {
            assert!(
                matches!(dispatcher.call(&args), Err(Error::DispatchError(_))),
                "expected dispatch error for {:?}",
                args
            );
        }
    }

    #[test]
    fn test_no_default_instance() {
        let dispatcher = Dispatcher::new(Arc::new(InstanceRegistry::new()));
        let err = dispatcher.call(&[json!("get"), json!("k")]);
        assert!(matches!(err, Err(Error::NoInstance)));
    }

    #[test]
    fn test_key_equal_to_namespace_is_read_as_namespace() {
        // A key that collides with a namespace name is always treated as the
        // namespace selector. This pins the current routing rule.
        let (registry, primary, fallback) = setup();
        let dispatcher = Dispatcher::new(registry);

        // Intended: has("primary") on the default. Actual: "has" is taken as
        // the operation on the "primary" instance with no key.
        let err = dispatcher.call(&[json!("primary"), json!("has")]);
        assert!(matches!(err, Err(Error::DispatchError(_))));

        // A lone namespace-like first argument is read as the operation name.
        let err = dispatcher.call(&[json!("primary")]);
        assert!(matches!(err, Err(Error::DispatchError(_))));

        assert!(!primary.has("primary").expect("Failed to check"));
        assert!(!fallback.has("primary").expect("Failed to check"));
    }

    #[test]
    fn test_padded_namespace_is_not_selected() {
        let (registry, primary, _) = setup();
        let dispatcher = Dispatcher::new(registry);

        // Falls through to the default, where " primary " is not an operation
        let err = dispatcher.call(&[json!(" primary "), json!("set"), json!("k"), json!("v")]);
        assert!(matches!(err, Err(Error::DispatchError(_))));
        assert!(!primary.has("k").expect("Failed to check"));
    }

    #[test]
    fn test_maximum_lifetime_is_accepted() {
        let (registry, primary, _) = setup();
        let dispatcher = Dispatcher::new(registry);

        let result = dispatcher
            .call(&[json!("primary"), json!("set"), json!("k"), json!("v"), json!(u64::MAX)])
            .expect("Failed to dispatch");

        assert_eq!(result, json!(true));
        assert_eq!(primary.get("k", None).expect("Failed to get"), json!("v"));
    }
}
