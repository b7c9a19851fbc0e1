//! Entity resolvers.
//!
//! A resolver turns one [`EntityKey`] into the fields its subgraph owns for
//! that entity. For a fixed generation a resolver must be a pure function of
//! the key: no resolver keeps mutable state, so a draining generation and its
//! successor agree on every key they both serve.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::execution::{ResolverSpec, ScalarKind, StaticEntry};
use crate::federation::error::ResolverFailure;
use crate::federation::representation::{canonical_key, EntityKey};

/// Resolution function registered for one entity type.
#[async_trait]
pub trait EntityResolver: Send + Sync + fmt::Debug {
    async fn resolve(&self, key: &EntityKey) -> Result<Map<String, Value>, ResolverFailure>;
}

/// Explicit key → object table with an optional declared default.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, Arc<Map<String, Value>>>,
    default: Option<Arc<Map<String, Value>>>,
}

impl StaticResolver {
    /// Build the table, coercing every listed key to `key_kind` so lookups
    /// compare like with like.
    pub fn new(
        entries: &[StaticEntry],
        default: Option<Map<String, Value>>,
        key_kind: Option<ScalarKind>,
    ) -> Result<Self, String> {
        let mut table = HashMap::new();
        for entry in entries {
            let value = Arc::new(entry.value.clone());
            for key in &entry.keys {
                table.insert(canonical_key(key, key_kind)?, Arc::clone(&value));
            }
        }
        Ok(Self {
            entries: table,
            default: default.map(Arc::new),
        })
    }
}

#[async_trait]
impl EntityResolver for StaticResolver {
    async fn resolve(&self, key: &EntityKey) -> Result<Map<String, Value>, ResolverFailure> {
        self.entries
            .get(key.canonical())
            .or(self.default.as_ref())
            .map(|fields| fields.as_ref().clone())
            .ok_or(ResolverFailure::NotFound)
    }
}

/// Returns the same object for every key.
#[derive(Debug, Clone)]
pub struct ConstantResolver {
    value: Map<String, Value>,
}

impl ConstantResolver {
    pub fn new(value: Map<String, Value>) -> Self {
        Self { value }
    }
}

#[async_trait]
impl EntityResolver for ConstantResolver {
    async fn resolve(&self, _key: &EntityKey) -> Result<Map<String, Value>, ResolverFailure> {
        Ok(self.value.clone())
    }
}

/// Build the resolver described by an execution config entry.
///
/// `key_kind` is the declared type of a single-field key, if any.
pub fn resolver_from_spec(
    spec: &ResolverSpec,
    key_kind: Option<ScalarKind>,
) -> Result<Arc<dyn EntityResolver>, String> {
    Ok(match spec {
        ResolverSpec::Static { entries, default } => {
            Arc::new(StaticResolver::new(entries, default.clone(), key_kind)?)
        }
        ResolverSpec::Constant { value } => Arc::new(ConstantResolver::new(value.clone())),
    })
}
