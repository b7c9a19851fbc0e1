//! Router instances and their request pipeline.
//!
//! # Data Flow
//! ```text
//! ExecutionConfig
//!     → instance.rs (RouterInstance::build: dispatcher + handler)
//!     → lifecycle engine publishes it as the active generation
//!
//! Request:
//!     engine.acquire() → instance.try_accept() (tracker.rs guard)
//!     → pipeline.rs (POST /graphql)
//!     → guard dropped → drain waiters woken
//! ```

pub mod instance;
pub mod pipeline;
pub mod tracker;

pub use instance::{Generation, InstanceStatus, RouterInstance};
pub use pipeline::{GraphQLRequest, GENERATION_HEADER};
pub use tracker::{InFlightGuard, InFlightTracker};
