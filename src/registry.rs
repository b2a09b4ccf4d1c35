//! Discriminator-keyed builder registry.
//!
//! Sources, inputs and outputs are all described by loosely typed YAML
//! mappings ("fragments"). A [`Registry`] picks the builder for a fragment
//! by one of its fields, layers caller overrides on top, normalizes the
//! dash-style keys used in configuration files, and hands the result to
//! the builder, which decodes it into typed fields with serde.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::error::Error;

/// An untyped configuration mapping.
pub type Fragment = Mapping;

/// Constructs an entity from a normalized fragment.
pub type Builder<T> = fn(Fragment) -> Result<T, Error>;

/// How the discriminator is read from a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackMethod {
    /// Read the field and leave it in place for the builder.
    #[default]
    Get,
    /// Remove the field, so the builder never sees it.
    Pop,
}

/// A table of builders for one kind of entity.
pub struct Registry<T> {
    kind: &'static str,
    fallback_key: &'static str,
    fallback_method: FallbackMethod,
    builders: HashMap<String, Builder<T>>,
}

impl<T> Registry<T> {
    /// Creates an empty registry that discriminates on `format` with
    /// [`FallbackMethod::Get`].
    ///
    /// `kind` names the entity in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fallback_key: "format",
            fallback_method: FallbackMethod::Get,
            builders: HashMap::new(),
        }
    }

    /// Changes the field used to pick a builder from a fragment.
    pub fn with_fallback(mut self, key: &'static str, method: FallbackMethod) -> Self {
        self.fallback_key = key;
        self.fallback_method = method;
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Associates every key in `keys` with `builder`.
    ///
    /// Registering an existing key replaces its builder.
    pub fn register<'k>(&mut self, keys: impl IntoIterator<Item = &'k str>, builder: Builder<T>) {
        for key in keys {
            self.builders.insert(key.to_owned(), builder);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.builders.contains_key(key)
    }

    /// Returns the registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.builders.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Looks up the builder registered for `key`.
    pub fn get(&self, key: &str) -> Result<Builder<T>, Error> {
        self.builders
            .get(key)
            .copied()
            .ok_or_else(|| Error::UnknownProvider {
                kind: self.kind,
                key: key.to_owned(),
            })
    }

    /// Reads the discriminator from `values`, removing it when the
    /// registry pops.
    pub fn discriminate(&self, values: &mut Fragment) -> Result<String, Error> {
        let field = Value::from(self.fallback_key);
        let value = match self.fallback_method {
            FallbackMethod::Get => values.get(&field).cloned(),
            FallbackMethod::Pop => values.remove(&field),
        };

        match value {
            Some(Value::String(key)) => Ok(key),
            Some(other) => Err(Error::validation(format!(
                "{} \"{}\" must be a string, got {}",
                self.kind,
                self.fallback_key,
                value_type(&other)
            ))),
            None => Err(Error::MissingDiscriminator {
                kind: self.kind,
                field: self.fallback_key.to_owned(),
            }),
        }
    }

    /// Builds an entity, choosing the builder from the fragment itself.
    pub fn build(&self, mut values: Fragment, overrides: Fragment) -> Result<T, Error> {
        let key = self.discriminate(&mut values)?;
        self.build_with(&key, values, overrides)
    }

    /// Builds an entity with the builder registered under `key`.
    pub fn build_with(&self, key: &str, values: Fragment, overrides: Fragment) -> Result<T, Error> {
        let builder = self.get(key)?;
        builder(normalize_keys(layer(values, overrides)))
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("fallback_key", &self.fallback_key)
            .field("fallback_method", &self.fallback_method)
            .field("keys", &self.keys())
            .finish()
    }
}

/// Returns `base` with every entry of `top` written over it.
pub fn layer(base: Fragment, top: Fragment) -> Fragment {
    let mut merged = base;
    for (key, value) in top {
        merged.insert(key, value);
    }
    merged
}

/// Rewrites `dash-case` keys as `snake_case`.
pub fn normalize_keys(fragment: Fragment) -> Fragment {
    fragment
        .into_iter()
        .map(|(key, value)| match key {
            Value::String(name) => (Value::String(name.replace('-', "_")), value),
            other => (other, value),
        })
        .collect()
}

/// Decodes a normalized fragment into typed fields.
pub fn decode<D: DeserializeOwned>(kind: &'static str, fragment: Fragment) -> Result<D, Error> {
    serde_yaml::from_value(Value::Mapping(fragment)).map_err(|source| Error::Fragment { kind, source })
}

/// Builds a single-entry fragment.
pub fn entry(key: &str, value: impl Into<Value>) -> Fragment {
    let mut fragment = Fragment::new();
    fragment.insert(Value::from(key), value.into());
    fragment
}

/// Human name of a YAML value's type, for error messages.
pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
