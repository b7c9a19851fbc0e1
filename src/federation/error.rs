//! Entity resolution errors.
//!
//! Every variant is scoped to a single entity: it is reported next to the
//! successes of the same batch and never takes down the serving instance.

use thiserror::Error;

/// Failure reported by a resolver for one key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverFailure {
    #[error("entity not found")]
    NotFound,

    #[error("backing data source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Per-entity dispatch error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("invalid entity representation: {reason}")]
    InvalidRepresentation { reason: String },

    #[error("unknown entity type `{typename}`")]
    UnknownEntityType { typename: String },

    #[error("could not resolve `{typename}` with key `{key}`: {failure}")]
    Resolution {
        typename: String,
        key: String,
        #[source]
        failure: ResolverFailure,
    },

    #[error("resolver for `{typename}` (key `{key}`) violated the schema contract: {detail}")]
    SchemaContractViolation {
        typename: String,
        key: String,
        detail: String,
    },
}

impl EntityError {
    /// Machine-readable code placed in GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            EntityError::InvalidRepresentation { .. } => "INVALID_REPRESENTATION",
            EntityError::UnknownEntityType { .. } => "UNKNOWN_ENTITY_TYPE",
            EntityError::Resolution { .. } => "ENTITY_RESOLUTION_ERROR",
            EntityError::SchemaContractViolation { .. } => "SCHEMA_CONTRACT_VIOLATION",
        }
    }

    /// Label used for the resolution outcome metric.
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            EntityError::InvalidRepresentation { .. } => "invalid_representation",
            EntityError::UnknownEntityType { .. } => "unknown_type",
            EntityError::Resolution { .. } => "resolution_error",
            EntityError::SchemaContractViolation { .. } => "contract_violation",
        }
    }
}
