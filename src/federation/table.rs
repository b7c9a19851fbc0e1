//! Per-generation resolver table.
//!
//! Built once from an [`ExecutionConfig`] and never modified afterwards; the
//! dispatcher shares it read-only across every request of the generation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::execution::{ConfigLoadError, ExecutionConfig, KeyFields};
use crate::federation::resolver::{resolver_from_spec, EntityResolver};

/// Everything needed to resolve one entity type.
#[derive(Debug, Clone)]
pub struct EntityBinding {
    pub typename: String,
    pub key: KeyFields,
    pub subgraph: String,
    pub resolver: Arc<dyn EntityResolver>,
}

#[derive(Debug, Clone, Default)]
pub struct EntityResolverTable {
    bindings: HashMap<String, EntityBinding>,
}

impl EntityResolverTable {
    /// Build the table for one generation from its own config only.
    pub fn from_config(config: &ExecutionConfig) -> Result<Self, ConfigLoadError> {
        let mut table = Self::default();
        let mut errors = Vec::new();

        for entity in config.entities() {
            let key_kind = match entity.key.names() {
                [field] => config
                    .schema()
                    .object_type(&entity.typename)
                    .and_then(|object| object.scalar(field)),
                _ => None,
            };
            match resolver_from_spec(&entity.resolver, key_kind) {
                Ok(resolver) => {
                    table = table.with_binding(EntityBinding {
                        typename: entity.typename.clone(),
                        key: entity.key.clone(),
                        subgraph: entity.subgraph.clone(),
                        resolver,
                    });
                }
                Err(reason) => errors.push(format!("resolver for `{}`: {reason}", entity.typename)),
            }
        }

        if errors.is_empty() {
            Ok(table)
        } else {
            Err(ConfigLoadError::Invalid(errors))
        }
    }

    /// Add a binding while the table is being assembled.
    pub fn with_binding(mut self, binding: EntityBinding) -> Self {
        self.bindings.insert(binding.typename.clone(), binding);
        self
    }

    pub fn get(&self, typename: &str) -> Option<&EntityBinding> {
        self.bindings.get(typename)
    }

    /// Entity types with a binding, sorted.
    pub fn typenames(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typenames_are_sorted() {
        let config = ExecutionConfig::from_slice(
            br#"{
            "schema": { "types": {
                "Employee": { "fields": ["id"] },
                "Cosmo": { "fields": ["upc"] }
            } },
            "subgraphs": [ { "name": "products", "url": "http://localhost:4004/graphql" } ],
            "entities": [
                { "typename": "Employee", "key": "id", "subgraph": "products",
                  "resolver": { "kind": "constant", "value": {} } },
                { "typename": "Cosmo", "key": "upc", "subgraph": "products",
                  "resolver": { "kind": "constant", "value": {} } }
            ]
        }"#,
        )
        .unwrap();

        let table = EntityResolverTable::from_config(&config).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.typenames(), ["Cosmo", "Employee"]);
        assert_eq!(table.get("Cosmo").unwrap().subgraph, "products");
    }
}
