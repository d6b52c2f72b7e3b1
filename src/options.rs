//! Option schemas and validation.
//!
//! Every driver declares an [`OptionSchema`]. The factory validates the
//! caller's [`OptionMap`] against it before the driver is built, yielding an
//! immutable [`OptionSet`] that the driver's typed config reads from.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Raw options as supplied by the caller.
pub type OptionMap = serde_json::Map<String, Value>;

/// Type an option value must have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionType {
    String,
    Int,
    Float,
    Bool,
    Array,
}

impl OptionType {
    /// Whether `value` satisfies this type.
    ///
    /// Float options also accept integral numbers; int options reject
    /// fractional ones.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            OptionType::String => value.is_string(),
            OptionType::Int => value.is_i64() || value.is_u64(),
            OptionType::Float => value.is_number(),
            OptionType::Bool => value.is_boolean(),
            OptionType::Array => value.is_array(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OptionType::String => "string",
            OptionType::Int => "int",
            OptionType::Float => "float",
            OptionType::Bool => "bool",
            OptionType::Array => "array",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a single option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionSpec {
    pub kind: OptionType,
    pub required: bool,
}

/// Declared options of a driver type: key → (type, required).
///
/// # Example
///
/// ```
/// use cache_registry::options::{OptionSchema, OptionType};
///
/// let schema = OptionSchema::new()
///     .required("host", OptionType::String)
///     .optional("timeout", OptionType::Float);
///
/// assert!(schema.spec("host").expect("declared").required);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionSchema {
    specs: BTreeMap<String, OptionSpec>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required option.
    pub fn required(self, key: &str, kind: OptionType) -> Self {
        self.declare(key, kind, true)
    }

    /// Declare an optional option.
    pub fn optional(self, key: &str, kind: OptionType) -> Self {
        self.declare(key, kind, false)
    }

    /// Declare `key`, replacing any earlier declaration of it.
    pub fn declare(mut self, key: &str, kind: OptionType, required: bool) -> Self {
        self.specs
            .insert(key.to_string(), OptionSpec { kind, required });
        self
    }

    /// Add every declaration of `other` that this schema does not already have.
    pub fn merge(mut self, other: &OptionSchema) -> Self {
        for (key, spec) in &other.specs {
            self.specs.entry(key.clone()).or_insert(*spec);
        }
        self
    }

    pub fn spec(&self, key: &str) -> Option<&OptionSpec> {
        self.specs.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionSpec)> {
        self.specs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Validate `options` against this schema.
    ///
    /// Keys the schema does not declare are ignored and left out of the
    /// resulting set.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` naming the first offending key, when a required
    /// key is absent or a present key has the wrong type.
    pub fn validate(&self, options: &OptionMap) -> Result<OptionSet> {
        let mut values = BTreeMap::new();

        for (key, spec) in &self.specs {
            match options.get(key) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(Error::config(
                            key,
                            format!("expected {} value, got {}", spec.kind, json_kind(value)),
                        ));
                    }
                    values.insert(key.clone(), value.clone());
                }
                None if spec.required => {
                    return Err(Error::config(key, "required option is missing"));
                }
                None => {}
            }
        }

        for key in options.keys().filter(|k| !self.specs.contains_key(*k)) {
            trace!("Ignoring undeclared option '{}'", key);
        }

        Ok(OptionSet { values })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated option values for one driver instance. Immutable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionSet {
    values: BTreeMap<String, Value>,
}

impl OptionSet {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    /// Read a non-negative int option, e.g. a port or an expiration.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if the value is negative.
    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get_int(key) {
            Some(n) => u64::try_from(n)
                .map(Some)
                .map_err(|_| Error::config(key, format!("must not be negative, got {}", n))),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Typed configuration read from a validated [`OptionSet`].
pub trait DriverConfig: Sized {
    /// Options this config understands.
    fn schema() -> OptionSchema;

    /// Build the typed config. Only called on a set validated with [`schema`].
    ///
    /// [`schema`]: DriverConfig::schema
    fn from_options(options: &OptionSet) -> Result<Self>;
}
