//! Entity resolution subsystem.
//!
//! # Data Flow
//! ```text
//! ExecutionConfig (one generation)
//!     → table.rs (typename → key fields, subgraph, resolver)
//!     → dispatcher.rs
//!
//! _entities request:
//!     representations[i]
//!     → representation.rs (parse __typename, extract key)
//!     → resolver.rs (static table | constant)
//!     → dispatcher.rs (schema contract check, merge key fields)
//!     → ResolvedEntity | EntityError, index-aligned
//! ```
//!
//! # Design Decisions
//! - One table per generation, immutable once built
//! - Errors never leave their slot unless the request opts into
//!   [`ErrorPolicy::FailRequest`]

pub mod dispatcher;
pub mod error;
pub mod representation;
pub mod resolver;
pub mod table;

pub use dispatcher::{apply_policy, EntityDispatcher, EntityResult, ErrorPolicy};
pub use error::{EntityError, ResolverFailure};
pub use representation::{EntityKey, EntityRepresentation, ResolvedEntity};
pub use resolver::{ConstantResolver, EntityResolver, StaticResolver};
pub use table::{EntityBinding, EntityResolverTable};
