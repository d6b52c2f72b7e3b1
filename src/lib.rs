//! # cache-registry
//!
//! Named cache instances behind one driver contract.
//!
//! ## Features
//!
//! - **Uniform Contract:** Every driver exposes `get`, `set`, `has`, `forget` and `purge`
//! - **Named Instances:** Register instances under namespaces; the newest one is the default
//! - **Validated Options:** Each driver declares an option schema, checked before construction
//! - **Generic Dispatch:** Call operations by name, routed by namespace or to the default
//! - **Explicit Teardown:** Instances are torn down once, optionally purging expired entries
//! - **Backends:** In-memory, file system and Redis (`redis` feature)
//!
//! ## Quick Start
//!
//! ```
//! use cache_registry::Cache;
//! use serde_json::json;
//!
//! // 1. Build the cache once at startup
//! let cache = Cache::new();
//!
//! // 2. Create instances; every creation becomes the default
//! let options = json!({ "default_expiration": 600 });
//! let options = options.as_object().expect("object");
//! let users = cache.create("memory", options, Some("users"))?;
//! cache.create("memory", options, None)?;
//!
//! // 3. Use an instance directly...
//! users.set("user:1", json!({ "name": "Ada" }), Some(60))?;
//!
//! // 4. ...or through the generic call surface
//! let user = cache.call(&[json!("users"), json!("get"), json!("user:1")])?;
//! assert_eq!(user["name"], "Ada");
//!
//! // 5. Tear everything down on exit
//! cache.shutdown()?;
//! # Ok::<(), cache_registry::Error>(())
//! ```

#[macro_use]
extern crate log;

pub mod dispatch;
pub mod driver;
pub mod error;
pub mod factory;
pub mod hash;
pub mod instance;
pub mod options;
pub mod registry;
pub mod service;

// Re-exports for convenience
pub use dispatch::Dispatcher;
pub use driver::CacheDriver;
pub use error::{Error, Result};
pub use factory::{DriverDescriptor, DriverFactory};
pub use hash::hash;
pub use instance::{CacheInstance, LifecycleState};
pub use options::{OptionMap, OptionSchema, OptionSet, OptionType};
pub use registry::InstanceRegistry;
pub use serde_json::Value;
pub use service::Cache;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
