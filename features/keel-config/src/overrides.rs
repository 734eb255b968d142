use std::collections::HashMap;

use config::{Config, Environment, Map, Source, ValueKind};

use crate::{errors::ConfigError, value::ConfigValue};

/// String keyed overrides for config parameters.
///
/// Parameters declare a typed default; an override registered under the same name replaces it.
#[derive(Debug, Clone, Default)]
pub struct ParamOverrides {
    values: HashMap<String, String>,
}

impl ParamOverrides {
    /// Initializes an empty set of overrides
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Loads every environment variable starting with `{prefix}_`.
    ///
    /// The remainder of the variable name is lowercased and `__` becomes `.`,
    /// so `KEEL_POOL__SIZE=8` with prefix `KEEL` overrides `pool.size`.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::load_env(prefix, None)
    }

    fn load_env(prefix: &str, vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let environment = Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
            .source(vars);
        let loaded = Config::builder()
            .add_source(environment)
            .build()
            .and_then(|loaded| loaded.collect())
            .map_err(|error| ConfigError::Environment {
                prefix: prefix.to_string(),
                reason: error.to_string(),
            })?;

        let mut overrides = Self::new();
        for (name, value) in loaded {
            overrides.insert_flattened(name, value.kind);
        }
        tracing::debug!(
            "Loaded {} config overrides with prefix '{prefix}'",
            overrides.len()
        );
        Ok(overrides)
    }

    /// Nested tables become dotted names
    fn insert_flattened(&mut self, name: String, kind: ValueKind) {
        match kind {
            ValueKind::Table(table) => {
                for (key, value) in table {
                    self.insert_flattened(format!("{name}.{key}"), value.kind);
                }
            }
            scalar => {
                tracing::trace!("Loaded config override '{name}' from the environment");
                self.insert(name, scalar.to_string());
            }
        }
    }

    /// Adds an override, replacing any previous value for the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        if let Some(previous) = self.values.insert(name.clone(), value.into()) {
            tracing::debug!("Config override '{name}' replaced previous value '{previous}'");
        }
        self
    }

    /// Adds all overrides from an iterator, later entries win
    pub fn extend<K, V>(&mut self, overrides: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in overrides {
            self.insert(name, value);
        }
        self
    }

    /// Raw override string for a name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// All overrides as `(name, value)`, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolves a parameter value.
    ///
    /// Returns the coerced override if one is registered for `name`, otherwise `default`.
    pub fn resolve<V: ConfigValue>(&self, name: &str, default: &V) -> Result<V, ConfigError> {
        match self.values.get(name) {
            Some(raw) => V::parse_override(raw).map_err(|reason| ConfigError::Coercion {
                name: name.to_string(),
                value: raw.clone(),
                target: V::target_name(),
                reason,
            }),
            None => Ok(default.clone()),
        }
    }
}
