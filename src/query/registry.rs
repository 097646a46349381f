//! Immutable lookup of query types.
//!
//! The registry is built once (from the config file or programmatically) and
//! then shared read-only, usually behind an `Arc`, by every batch call.

use std::collections::BTreeMap;

use super::{QueryConfig, QueryDefinition};
use crate::error::{BatchError, Result};

/// Query type name to configuration, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    configs: BTreeMap<String, QueryConfig>,
}

impl QueryRegistry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Builds a registry from config-file definitions.
    pub fn from_definitions<'a, I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a QueryDefinition)>,
    {
        definitions
            .into_iter()
            .try_fold(Self::builder(), |builder, (name, definition)| {
                builder.register(definition.clone().into_config(name)?)
            })
            .map(RegistryBuilder::build)
    }

    /// Looks up a query type.
    pub fn get(&self, query_type: &str) -> Option<&QueryConfig> {
        self.configs.get(query_type)
    }

    /// Returns true if the query type is registered.
    pub fn contains(&self, query_type: &str) -> bool {
        self.configs.contains_key(query_type)
    }

    /// Iterates over `(type, config)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryConfig)> {
        self.configs.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Registered query type names in name order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Collects configs before freezing them into a [`QueryRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    configs: BTreeMap<String, QueryConfig>,
}

impl RegistryBuilder {
    /// Adds a query type. Names must be unique.
    pub fn register(mut self, config: QueryConfig) -> Result<Self> {
        let name = config.name().to_string();
        if name.is_empty() {
            return Err(BatchError::config("Query type name must not be empty"));
        }
        if self.configs.contains_key(&name) {
            return Err(BatchError::config(format!(
                "Query type '{name}' is registered twice"
            )));
        }
        self.configs.insert(name, config);
        Ok(self)
    }

    pub fn build(self) -> QueryRegistry {
        QueryRegistry {
            configs: self.configs,
        }
    }
}
