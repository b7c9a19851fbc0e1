//! Execution config validation.
//!
//! # Responsibilities
//! - Check referential integrity (entities reference declared types and subgraphs)
//! - Check that key fields are declared fields of their type
//! - Check static resolver keys are scalars of the declared key type and not duplicated
//! - Check scalar types are only given for declared fields
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Resolved field shapes are checked per request by the dispatcher, not here

use std::collections::HashSet;

use crate::execution::config::{ExecutionConfigDocument, ResolverSpec};
use crate::federation::representation::canonical_key;

pub fn validate_document(document: &ExecutionConfigDocument) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let mut subgraphs = HashSet::new();
    for subgraph in &document.subgraphs {
        if subgraph.name.trim().is_empty() {
            errors.push("subgraph name must not be empty".to_string());
        } else if !subgraphs.insert(subgraph.name.as_str()) {
            errors.push(format!("subgraph `{}` is declared more than once", subgraph.name));
        }
    }

    let mut typenames = HashSet::new();
    for entity in &document.entities {
        let typename = entity.typename.as_str();
        if !typenames.insert(typename) {
            errors.push(format!("entity `{typename}` is declared more than once"));
        }

        match document.schema.object_type(typename) {
            None => errors.push(format!("entity `{typename}` is not a type of the schema")),
            Some(object) => {
                for field in entity.key.names() {
                    if !object.declares(field) {
                        errors.push(format!(
                            "key field `{field}` is not declared on `{typename}`"
                        ));
                    }
                }
            }
        }

        if entity.key.is_empty() {
            errors.push(format!("entity `{typename}` has no key fields"));
        }

        if !subgraphs.contains(entity.subgraph.as_str()) {
            errors.push(format!(
                "entity `{typename}` references unknown subgraph `{}`",
                entity.subgraph
            ));
        }

        if let ResolverSpec::Static { entries, .. } = &entity.resolver {
            let key_kind = match entity.key.names() {
                [field] => document
                    .schema
                    .object_type(typename)
                    .and_then(|object| object.scalar(field)),
                _ => None,
            };
            let mut seen = HashSet::new();
            for key in entries.iter().flat_map(|entry| entry.keys.iter()) {
                match canonical_key(key, key_kind) {
                    Ok(canonical) => {
                        if !seen.insert(canonical.clone()) {
                            errors.push(format!(
                                "static resolver for `{typename}` lists key `{canonical}` twice"
                            ));
                        }
                    }
                    Err(reason) => errors.push(format!(
                        "static resolver for `{typename}` has an invalid key: {reason}"
                    )),
                }
            }
        }
    }

    for (typename, object) in &document.schema.types {
        for field in object.scalars.keys() {
            if !object.declares(field) {
                errors.push(format!(
                    "scalar type given for undeclared field `{field}` of `{typename}`"
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> ExecutionConfigDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_consistent_document() {
        let doc = document(
            r#"{
            "schema": { "types": { "Employee": { "fields": ["id", "notes"] } } },
            "subgraphs": [ { "name": "products", "url": "http://localhost:4004/graphql" } ],
            "entities": [ { "typename": "Employee", "key": "id", "subgraph": "products",
                "resolver": { "kind": "static", "entries": [ { "keys": [1, "2"], "value": {} } ] } } ]
        }"#,
        );
        assert_eq!(validate_document(&doc), Ok(()));
    }

    #[test]
    fn reports_every_broken_reference() {
        let doc = document(
            r#"{
            "schema": { "types": { "Employee": { "fields": ["id"] } } },
            "subgraphs": [
                { "name": "products", "url": "http://localhost:4004/graphql" },
                { "name": "products", "url": "http://localhost:4005/graphql" }
            ],
            "entities": [
                { "typename": "Employee", "key": "upc", "subgraph": "employees",
                  "resolver": { "kind": "static", "entries": [
                      { "keys": [1, 1.0, {"x": 1}], "value": {} }
                  ] } },
                { "typename": "Ghost", "key": "id", "subgraph": "products",
                  "resolver": { "kind": "constant", "value": {} } }
            ]
        }"#,
        );

        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("`products` is declared more than once")));
        assert!(errors.iter().any(|e| e.contains("key field `upc`")));
        assert!(errors.iter().any(|e| e.contains("unknown subgraph `employees`")));
        assert!(errors.iter().any(|e| e.contains("is not a scalar")));
        assert!(errors.iter().any(|e| e.contains("lists key `1` twice")));
        assert!(errors.iter().any(|e| e.contains("`Ghost` is not a type")));
    }

    #[test]
    fn static_keys_must_match_declared_key_type() {
        let doc = document(
            r#"{
            "schema": { "types": { "Employee": {
                "fields": ["id"], "scalars": { "id": "Int", "salary": "Float" }
            } } },
            "subgraphs": [ { "name": "products", "url": "http://localhost:4004/graphql" } ],
            "entities": [ { "typename": "Employee", "key": "id", "subgraph": "products",
                "resolver": { "kind": "static", "entries": [ { "keys": [1, "abc", 2.0, "2"], "value": {} } ] } } ]
        }"#,
        );

        let errors = validate_document(&doc).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("`\"abc\"` is not a valid Int")));
        assert!(errors.iter().any(|e| e.contains("lists key `2` twice")));
        assert!(errors.iter().any(|e| e.contains("undeclared field `salary`")));
    }
}
