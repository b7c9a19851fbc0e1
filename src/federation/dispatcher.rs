//! Entity dispatch.
//!
//! # Responsibilities
//! - Look up the resolver registered for a representation's typename
//! - Extract the key and invoke the resolver
//! - Check the result against the fields the merged schema declares
//! - Resolve batches concurrently, index-aligned with the request
//!
//! # Design Decisions
//! - No mutable state: the table and schema are read-only after construction,
//!   so dispatch takes no locks
//! - Errors are per entity; the caller's [`ErrorPolicy`] decides whether one
//!   failure fails the whole batch

use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;

use crate::execution::{ConfigLoadError, ExecutionConfig, MergedSchema};
use crate::federation::error::EntityError;
use crate::federation::representation::{EntityRepresentation, ResolvedEntity, TYPENAME_FIELD};
use crate::federation::table::EntityResolverTable;
use crate::observability::metrics;

/// How per-entity errors propagate to the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Report errors next to the successes of the same batch.
    #[default]
    PerEntity,
    /// The first error (in request order) fails the whole batch.
    FailRequest,
}

pub type EntityResult = Result<ResolvedEntity, EntityError>;

#[derive(Debug)]
pub struct EntityDispatcher {
    table: EntityResolverTable,
    schema: MergedSchema,
}

impl EntityDispatcher {
    pub fn new(table: EntityResolverTable, schema: MergedSchema) -> Self {
        Self { table, schema }
    }

    pub fn from_config(config: &ExecutionConfig) -> Result<Self, ConfigLoadError> {
        Ok(Self::new(
            EntityResolverTable::from_config(config)?,
            config.schema().clone(),
        ))
    }

    pub fn table(&self) -> &EntityResolverTable {
        &self.table
    }

    /// Resolve one representation.
    pub async fn dispatch(&self, representation: &EntityRepresentation) -> EntityResult {
        let result = self.resolve(representation).await;
        let outcome = match &result {
            Ok(_) => "resolved",
            Err(e) => e.outcome(),
        };
        metrics::record_entity_resolution(representation.typename(), outcome);
        result
    }

    async fn resolve(&self, representation: &EntityRepresentation) -> EntityResult {
        let typename = representation.typename();
        let binding = self
            .table
            .get(typename)
            .ok_or_else(|| EntityError::UnknownEntityType {
                typename: typename.to_string(),
            })?;

        let key = representation
            .key(&binding.key, self.schema.object_type(typename))
            .map_err(|failure| EntityError::Resolution {
                typename: typename.to_string(),
                key: representation.describe(),
                failure,
            })?;

        let resolved = binding
            .resolver
            .resolve(&key)
            .await
            .map_err(|failure| EntityError::Resolution {
                typename: typename.to_string(),
                key: key.to_string(),
                failure,
            })?;

        let violation = |detail: String| EntityError::SchemaContractViolation {
            typename: typename.to_string(),
            key: key.to_string(),
            detail,
        };
        let object = self
            .schema
            .object_type(typename)
            .ok_or_else(|| violation(format!("`{typename}` is not declared in the schema")))?;
        if let Some(field) = resolved
            .keys()
            .find(|field| field.as_str() != TYPENAME_FIELD && !object.declares(field))
        {
            return Err(violation(format!("field `{field}` is not declared on `{typename}`")));
        }

        let mut fields = resolved;
        fields.remove(TYPENAME_FIELD);
        for (name, value) in key.values() {
            fields.insert(name.clone(), value.clone());
        }
        Ok(ResolvedEntity::new(typename.to_string(), fields))
    }

    /// Resolve a batch of wire representations concurrently.
    ///
    /// The result is index-aligned with `representations`; a malformed
    /// representation only fails its own slot.
    pub async fn dispatch_batch(&self, representations: Vec<Value>) -> Vec<EntityResult> {
        let parsed: Vec<_> = representations
            .into_iter()
            .map(EntityRepresentation::from_value)
            .collect();

        join_all(parsed.iter().map(|representation| async move {
            match representation {
                Ok(representation) => self.dispatch(representation).await,
                Err(e) => Err(e.clone()),
            }
        }))
        .await
    }
}

/// Apply an error policy to a finished batch.
///
/// Under [`ErrorPolicy::FailRequest`] the first failing slot is returned with
/// its index in the batch.
pub fn apply_policy(
    results: Vec<EntityResult>,
    policy: ErrorPolicy,
) -> Result<Vec<EntityResult>, (usize, EntityError)> {
    if policy == ErrorPolicy::FailRequest {
        if let Some((index, Err(e))) = results.iter().enumerate().find(|(_, r)| r.is_err()) {
            return Err((index, e.clone()));
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::KeyFields;
    use crate::federation::error::ResolverFailure;
    use crate::federation::representation::EntityKey;
    use crate::federation::resolver::EntityResolver;
    use crate::federation::table::EntityBinding;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Arc;

    const CONFIG: &str = r#"{
        "schema": { "types": {
            "Employee": { "fields": ["id", "notes"] },
            "Broken": { "fields": ["id"] }
        } },
        "subgraphs": [ { "name": "products", "url": "http://localhost:4004/graphql" } ],
        "entities": [
            { "typename": "Employee", "key": "id", "subgraph": "products",
              "resolver": { "kind": "static",
                  "entries": [ { "keys": [1], "value": { "notes": "one" } } ] } },
            { "typename": "Broken", "key": "id", "subgraph": "products",
              "resolver": { "kind": "constant", "value": { "salary": 10 } } }
        ]
    }"#;

    fn dispatcher() -> EntityDispatcher {
        let config = ExecutionConfig::from_slice(CONFIG.as_bytes()).unwrap();
        EntityDispatcher::from_config(&config).unwrap()
    }

    fn repr(value: Value) -> EntityRepresentation {
        EntityRepresentation::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn resolves_registered_type_with_key_fields() {
        let entity = dispatcher()
            .dispatch(&repr(json!({"__typename": "Employee", "id": 1})))
            .await
            .unwrap();
        assert_eq!(
            entity.into_value(),
            json!({"__typename": "Employee", "id": 1, "notes": "one"})
        );
    }

    #[tokio::test]
    async fn unknown_type_is_reported_per_entity() {
        let err = dispatcher()
            .dispatch(&repr(json!({"__typename": "Ghost", "id": 1})))
            .await
            .unwrap_err();
        assert_eq!(err, EntityError::UnknownEntityType { typename: "Ghost".into() });
    }

    #[tokio::test]
    async fn lookup_failure_carries_typename_and_key() {
        let err = dispatcher()
            .dispatch(&repr(json!({"__typename": "Employee", "id": 2})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EntityError::Resolution {
                typename: "Employee".into(),
                key: "2".into(),
                failure: ResolverFailure::NotFound,
            }
        );
    }

    #[tokio::test]
    async fn missing_key_field_is_resolution_error() {
        let err = dispatcher()
            .dispatch(&repr(json!({"__typename": "Employee", "upc": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ENTITY_RESOLUTION_ERROR");
    }

    #[tokio::test]
    async fn undeclared_field_is_contract_violation() {
        let err = dispatcher()
            .dispatch(&repr(json!({"__typename": "Broken", "id": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, EntityError::SchemaContractViolation { ref detail, .. } if detail.contains("salary")));
    }

    #[tokio::test]
    async fn batch_is_index_aligned() {
        let results = dispatcher()
            .dispatch_batch(vec![
                json!({"__typename": "Employee", "id": 1}),
                json!({"id": 1}),
                json!({"__typename": "Ghost", "id": 1}),
                json!({"__typename": "Employee", "id": "1"}),
            ])
            .await;

        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().code(), "INVALID_REPRESENTATION");
        assert_eq!(results[2].as_ref().unwrap_err().code(), "UNKNOWN_ENTITY_TYPE");
        assert_eq!(results[3].as_ref().unwrap().get("notes"), Some(&json!("one")));
    }

    #[tokio::test]
    async fn fail_request_policy_surfaces_first_error() {
        let results = dispatcher()
            .dispatch_batch(vec![
                json!({"__typename": "Employee", "id": 1}),
                json!({"__typename": "Ghost", "id": 1}),
                json!({"__typename": "Employee", "id": 2}),
            ])
            .await;

        let (index, err) = apply_policy(results.clone(), ErrorPolicy::FailRequest).unwrap_err();
        assert_eq!(index, 1);
        assert_eq!(err.code(), "UNKNOWN_ENTITY_TYPE");
        assert_eq!(apply_policy(results, ErrorPolicy::PerEntity).unwrap().len(), 3);
    }

    #[derive(Debug)]
    struct Unavailable;

    #[async_trait]
    impl EntityResolver for Unavailable {
        async fn resolve(&self, _key: &EntityKey) -> Result<Map<String, Value>, ResolverFailure> {
            Err(ResolverFailure::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn unavailable_backend_is_resolution_error() {
        let table = EntityResolverTable::default().with_binding(EntityBinding {
            typename: "Employee".into(),
            key: KeyFields::from("id".to_string()),
            subgraph: "products".into(),
            resolver: Arc::new(Unavailable),
        });
        let config = ExecutionConfig::from_slice(CONFIG.as_bytes()).unwrap();
        let dispatcher = EntityDispatcher::new(table, config.schema().clone());

        let err = dispatcher
            .dispatch(&repr(json!({"__typename": "Employee", "id": 1})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
