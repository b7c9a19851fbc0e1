//! Compiled execution config.
//!
//! The execution config is the JSON artifact produced by composing the
//! federated schema and the subgraph registry. Once parsed it is frozen into
//! an [`ExecutionConfig`]; a change on disk always produces a new value.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use url::Url;

use crate::execution::error::ConfigLoadError;
use crate::execution::validation::validate_document;

/// Content identity of an execution config: SHA-256 of the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConfigId(String);

impl ConfigId {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines and headers.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk shape of the execution config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfigDocument {
    /// Optional human-readable label, e.g. a composition id.
    #[serde(default)]
    pub version: Option<String>,
    pub schema: MergedSchema,
    #[serde(default)]
    pub subgraphs: Vec<Subgraph>,
    #[serde(default)]
    pub entities: Vec<EntityDeclaration>,
}

/// The composed schema as far as the router needs it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MergedSchema {
    /// Federated SDL, served back through `_service { sdl }`.
    #[serde(default)]
    pub sdl: String,
    /// Object types and their declared fields.
    #[serde(default)]
    pub types: BTreeMap<String, ObjectType>,
}

impl MergedSchema {
    pub fn object_type(&self, typename: &str) -> Option<&ObjectType> {
        self.types.get(typename)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ObjectType {
    pub fields: BTreeSet<String>,
    /// Declared scalar types. Key fields listed here are coerced to their
    /// type before lookup; unlisted fields are compared as given.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scalars: BTreeMap<String, ScalarKind>,
}

impl ObjectType {
    pub fn declares(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn scalar(&self, field: &str) -> Option<ScalarKind> {
        self.scalars.get(field).copied()
    }
}

/// Built-in GraphQL scalar types a key field may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Boolean,
    #[serde(rename = "ID")]
    Id,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::String => "String",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Id => "ID",
        })
    }
}

/// A backend data source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Subgraph {
    pub name: String,
    pub url: Url,
}

/// Key fields of an entity, written as in `@key(fields: "id")`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct KeyFields(Vec<String>);

impl KeyFields {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for KeyFields {
    fn from(raw: String) -> Self {
        Self(raw.split_whitespace().map(str::to_string).collect())
    }
}

impl From<KeyFields> for String {
    fn from(keys: KeyFields) -> Self {
        keys.0.join(" ")
    }
}

/// An entity type this router can resolve by key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDeclaration {
    pub typename: String,
    pub key: KeyFields,
    /// Name of the subgraph that owns the resolved fields.
    pub subgraph: String,
    pub resolver: ResolverSpec,
}

/// How an entity's fields are looked up.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolverSpec {
    /// Explicit key → object table with an optional declared default.
    Static {
        entries: Vec<StaticEntry>,
        #[serde(default)]
        default: Option<Map<String, Value>>,
    },
    /// The same object for every key.
    Constant { value: Map<String, Value> },
}

/// One row of a static table; every key in `keys` maps to `value`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StaticEntry {
    pub keys: Vec<Value>,
    pub value: Map<String, Value>,
}

/// An immutable, validated execution config generation.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    id: ConfigId,
    version: Option<String>,
    schema: MergedSchema,
    subgraphs: Vec<Subgraph>,
    entities: Vec<EntityDeclaration>,
}

impl ExecutionConfig {
    /// Parse and validate raw execution config bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigLoadError> {
        let document: ExecutionConfigDocument = serde_json::from_slice(bytes)?;
        validate_document(&document).map_err(ConfigLoadError::Invalid)?;

        Ok(Self {
            id: ConfigId::of(bytes),
            version: document.version,
            schema: document.schema,
            subgraphs: document.subgraphs,
            entities: document.entities,
        })
    }

    pub fn id(&self) -> &ConfigId {
        &self.id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn schema(&self) -> &MergedSchema {
        &self.schema
    }

    pub fn subgraphs(&self) -> &[Subgraph] {
        &self.subgraphs
    }

    pub fn entities(&self) -> &[EntityDeclaration] {
        &self.entities
    }
}
