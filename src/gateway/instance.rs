//! Router instances.
//!
//! # Responsibilities
//! - Bind one execution config generation to its handler pipeline
//! - Own the generation's entity dispatcher and in-flight counter
//! - Walk the status machine `Active → Draining → Drained → Terminated`
//!
//! # Design Decisions
//! - Accepting a request is increment-then-check: the in-flight count is
//!   raised before the status is read, so a drain that flips the status and
//!   then waits for zero can never miss a request that saw `Active`
//! - Forced termination fires a [`CancellationToken`]; handlers racing
//!   against it unwind instead of running past the drain grace period

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::execution::{ConfigId, ConfigLoadError, ExecutionConfig};
use crate::federation::EntityDispatcher;
use crate::gateway::pipeline;
use crate::gateway::tracker::{InFlightGuard, InFlightTracker};

/// Identity of one configuration generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Arrival order; strictly increasing across activations.
    pub sequence: u64,
    pub config_id: ConfigId,
    pub version: Option<String>,
}

impl Generation {
    /// Short label used in logs and the `x-router-generation` header.
    pub fn label(&self) -> String {
        format!("{}-{}", self.sequence, self.config_id.short())
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InstanceStatus {
    Active = 0,
    Draining = 1,
    Drained = 2,
    Terminated = 3,
}

impl InstanceStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => InstanceStatus::Active,
            1 => InstanceStatus::Draining,
            2 => InstanceStatus::Drained,
            _ => InstanceStatus::Terminated,
        }
    }
}

pub struct RouterInstance {
    generation: Generation,
    config: Arc<ExecutionConfig>,
    dispatcher: Arc<EntityDispatcher>,
    handler: axum::Router,
    status: AtomicU8,
    in_flight: InFlightTracker,
    cancel: CancellationToken,
    created_at: Instant,
}

impl RouterInstance {
    /// Build an instance for `config`. Nothing is shared with other
    /// generations; a failure leaves no partial state behind.
    pub fn build(sequence: u64, config: Arc<ExecutionConfig>) -> Result<Arc<Self>, ConfigLoadError> {
        let dispatcher = Arc::new(EntityDispatcher::from_config(&config)?);
        let generation = Generation {
            sequence,
            config_id: config.id().clone(),
            version: config.version().map(str::to_string),
        };
        let handler = pipeline::router(pipeline::PipelineState::new(
            generation.label(),
            Arc::clone(&dispatcher),
            config.schema().sdl.clone(),
        ));

        tracing::debug!(
            generation = %generation,
            entity_types = dispatcher.table().len(),
            "Router instance built"
        );

        Ok(Arc::new(Self {
            generation,
            config,
            dispatcher,
            handler,
            status: AtomicU8::new(InstanceStatus::Active as u8),
            in_flight: InFlightTracker::new(),
            cancel: CancellationToken::new(),
            created_at: Instant::now(),
        }))
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn config(&self) -> &Arc<ExecutionConfig> {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<EntityDispatcher> {
        &self.dispatcher
    }

    /// Per-instance handler pipeline.
    pub fn handler(&self) -> axum::Router {
        self.handler.clone()
    }

    pub fn status(&self) -> InstanceStatus {
        InstanceStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.count()
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Accept one request if this instance is still Active.
    pub fn try_accept(&self) -> Option<InFlightGuard> {
        let guard = self.in_flight.track();
        if self.status() == InstanceStatus::Active {
            Some(guard)
        } else {
            None
        }
    }

    /// Stop accepting. Returns false if the instance was not Active.
    pub fn begin_drain(&self) -> bool {
        self.transition(InstanceStatus::Active, InstanceStatus::Draining)
    }

    /// Wait for every accepted request to finish, then mark Drained.
    pub async fn wait_drained(&self) {
        self.in_flight.wait_idle().await;
        self.transition(InstanceStatus::Draining, InstanceStatus::Drained);
    }

    /// Cancel whatever is still running against this instance.
    pub fn terminate(&self) {
        let previous = self.status.swap(InstanceStatus::Terminated as u8, Ordering::SeqCst);
        self.cancel.cancel();
        if InstanceStatus::from_u8(previous) != InstanceStatus::Terminated {
            tracing::debug!(
                generation = %self.generation,
                in_flight = self.in_flight(),
                "Router instance terminated"
            );
        }
    }

    /// Completes once the instance has been terminated.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    fn transition(&self, from: InstanceStatus, to: InstanceStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl fmt::Debug for RouterInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterInstance")
            .field("generation", &self.generation)
            .field("status", &self.status())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
