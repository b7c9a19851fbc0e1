//! Entity representations and results.

use std::fmt;

use serde_json::{Map, Number, Value};

use crate::execution::{KeyFields, ObjectType, ScalarKind};
use crate::federation::error::{EntityError, ResolverFailure};

/// Field carrying the entity type inside a representation.
pub const TYPENAME_FIELD: &str = "__typename";

/// Integers up to this magnitude survive a round trip through `f64`.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Render a scalar key value the way static tables spell their keys.
///
/// Strings are taken verbatim and booleans use their JSON text. Numbers use
/// their JSON text, except that whole floats take integer form (`2.0` is `2`).
/// Objects, arrays and null are not valid key values.
pub fn canonical_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(canonical_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerce a key value to its declared scalar type and render it canonically.
///
/// Without a declared type any scalar is accepted as in [`canonical_scalar`].
pub fn canonical_key(value: &Value, kind: Option<ScalarKind>) -> Result<String, String> {
    let coerced = match (kind, value) {
        (None, value) => canonical_scalar(value),
        (Some(ScalarKind::Int), Value::Number(n)) => whole_number(n).map(|i| i.to_string()),
        (Some(ScalarKind::Int), Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| i.to_string()),
        (Some(ScalarKind::Float), Value::Number(n)) => Some(canonical_number(n)),
        (Some(ScalarKind::Float), Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(|n| canonical_number(&n)),
        (Some(ScalarKind::String | ScalarKind::Id), Value::String(s)) => Some(s.clone()),
        (Some(ScalarKind::Id), Value::Number(n)) => n.as_i64().map(|i| i.to_string()),
        (Some(ScalarKind::Boolean), Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    };
    coerced.ok_or_else(|| match kind {
        Some(kind) => format!("`{value}` is not a valid {kind}"),
        None => format!("`{value}` is not a scalar"),
    })
}

fn whole_number(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT).then_some(f as i64)
}

fn canonical_number(n: &Number) -> String {
    whole_number(n).map_or_else(|| n.to_string(), |i| i.to_string())
}

/// Typename plus the fields sent to identify one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRepresentation {
    typename: String,
    fields: Map<String, Value>,
}

impl EntityRepresentation {
    pub fn new(typename: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            typename: typename.into(),
            fields,
        }
    }

    /// Read a wire representation: a JSON object with a `__typename`.
    pub fn from_value(value: Value) -> Result<Self, EntityError> {
        let Value::Object(mut fields) = value else {
            return Err(EntityError::InvalidRepresentation {
                reason: "representation must be an object".to_string(),
            });
        };
        match fields.remove(TYPENAME_FIELD) {
            Some(Value::String(typename)) => Ok(Self { typename, fields }),
            _ => Err(EntityError::InvalidRepresentation {
                reason: format!("representation is missing a string `{TYPENAME_FIELD}`"),
            }),
        }
    }

    pub fn typename(&self) -> &str {
        &self.typename
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Extract the key named by `key_fields`, coercing each value to the
    /// scalar type `object` declares for it.
    pub fn key(
        &self,
        key_fields: &KeyFields,
        object: Option<&ObjectType>,
    ) -> Result<EntityKey, ResolverFailure> {
        let mut values = Vec::with_capacity(key_fields.names().len());
        let mut canonical = Vec::with_capacity(key_fields.names().len());

        for name in key_fields.names() {
            let value = self
                .fields
                .get(name)
                .ok_or_else(|| ResolverFailure::InvalidKey(format!("missing key field `{name}`")))?;
            let kind = object.and_then(|object| object.scalar(name));
            let rendered = canonical_key(value, kind).map_err(|reason| {
                ResolverFailure::InvalidKey(format!("key field `{name}`: {reason}"))
            })?;
            values.push((name.clone(), value.clone()));
            canonical.push(rendered);
        }

        Ok(EntityKey {
            values,
            canonical: canonical.join(","),
        })
    }

    /// Compact rendering used in errors when no key could be extracted.
    pub(crate) fn describe(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

/// Key-field values identifying one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityKey {
    values: Vec<(String, Value)>,
    canonical: String,
}

impl EntityKey {
    /// Key-field values in key order joined with `,`.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// A populated entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    typename: String,
    fields: Map<String, Value>,
}

impl ResolvedEntity {
    pub(crate) fn new(typename: String, fields: Map<String, Value>) -> Self {
        Self { typename, fields }
    }

    pub fn typename(&self) -> &str {
        &self.typename
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The wire object, `__typename` included.
    pub fn into_value(self) -> Value {
        let mut object = self.fields;
        object.insert(TYPENAME_FIELD.to_string(), Value::String(self.typename));
        Value::Object(object)
    }
}
