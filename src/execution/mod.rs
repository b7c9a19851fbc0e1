//! Execution config subsystem.
//!
//! # Data Flow
//! ```text
//! execution config file (JSON, produced by composition)
//!     → source.rs (read bytes)
//!     → config.rs (hash bytes → ConfigId, deserialize)
//!     → validation.rs (referential checks)
//!     → ExecutionConfig (immutable, one per generation)
//! ```
//!
//! # Design Decisions
//! - Identity is the SHA-256 of the raw bytes, so re-reading an unchanged
//!   file yields the same generation identity
//! - Never mutated; a reload always builds a new value

pub mod config;
pub mod error;
pub mod source;
pub mod validation;

pub use config::{
    ConfigId, EntityDeclaration, ExecutionConfig, KeyFields, MergedSchema, ObjectType,
    ResolverSpec, ScalarKind, StaticEntry, Subgraph,
};
pub use error::ConfigLoadError;
pub use source::{ConfigChange, ConfigSource, FileConfigSource};
