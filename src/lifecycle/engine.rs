//! Lifecycle engine: instance creation, hot swap and bounded shutdown.
//!
//! # Responsibilities
//! - Build the first router instance and publish it as active
//! - Replace the active instance on reload without dropping traffic
//! - Drain superseded instances in the background, bounded by a grace period
//! - Stop accepting on shutdown and return by the deadline
//!
//! # States
//! ```text
//! Initializing → Serving → Reloading → Serving | Fatal
//! Serving → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - The active instance lives behind one [`ArcSwap`]; it is the only
//!   synchronization point on the request path
//! - Swap order is drain-then-publish: the previous instance stops accepting
//!   before its successor becomes visible, and [`LifecycleEngine::acquire`]
//!   retries on the new pointer, so every request belongs to exactly one
//!   generation
//! - One reload at a time, serialized by a mutex; shutdown takes the same
//!   mutex after flipping the state to Draining, so queued reloads see the
//!   state and give up

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::config::{ConcurrentReloadPolicy, LifecycleConfig};
use crate::execution::ExecutionConfig;
use crate::gateway::{Generation, InFlightGuard, InstanceStatus, RouterInstance};
use crate::lifecycle::error::{LifecycleError, StartupError};
use crate::observability::metrics;

/// How many times `acquire` re-reads the active pointer during a swap.
const ACQUIRE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Initializing,
    Serving,
    Reloading,
    Draining,
    Stopped,
    Fatal,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Initializing => "initializing",
            EngineState::Serving => "serving",
            EngineState::Reloading => "reloading",
            EngineState::Draining => "draining",
            EngineState::Stopped => "stopped",
            EngineState::Fatal => "fatal",
        }
    }

    /// Whether new requests may still be accepted.
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Serving | EngineState::Reloading)
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// How long a superseded instance may keep serving.
    pub drain_grace: Duration,
    pub concurrent_reload: ConcurrentReloadPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            drain_grace: config.drain_grace(),
            concurrent_reload: config.concurrent_reload,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&LifecycleConfig::default())
    }
}

/// Result of a successful `update_and_activate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Activated {
        previous: Generation,
        current: Generation,
    },
    /// Same content as the active generation; nothing changed.
    Unchanged(Generation),
}

/// Exclusive right to reload, held for the duration of one reload.
#[derive(Debug)]
pub struct ReloadPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// A request admitted by the active generation.
///
/// The instance counts the request as in flight until this is dropped.
#[derive(Debug)]
pub struct ActiveRequest {
    instance: Arc<RouterInstance>,
    _guard: InFlightGuard,
}

impl ActiveRequest {
    pub fn instance(&self) -> &Arc<RouterInstance> {
        &self.instance
    }
}

pub struct LifecycleEngine {
    settings: EngineSettings,
    active: ArcSwap<RouterInstance>,
    draining: DashMap<u64, Arc<RouterInstance>>,
    sequence: AtomicU64,
    reload_lock: Mutex<()>,
    state: watch::Sender<EngineState>,
}

impl LifecycleEngine {
    /// Build the first instance from `initial` and start serving it.
    pub fn start(
        initial: ExecutionConfig,
        settings: EngineSettings,
    ) -> Result<Arc<Self>, LifecycleError> {
        let (state, _) = watch::channel(EngineState::Initializing);
        let instance = RouterInstance::build(1, Arc::new(initial)).map_err(StartupError::Config)?;

        let engine = Arc::new(Self {
            settings,
            active: ArcSwap::new(Arc::clone(&instance)),
            draining: DashMap::new(),
            sequence: AtomicU64::new(1),
            reload_lock: Mutex::new(()),
            state,
        });
        engine.transition(EngineState::Initializing, EngineState::Serving);

        metrics::set_active_generation(instance.generation().sequence);
        tracing::info!(
            generation = %instance.generation(),
            version = instance.generation().version.as_deref().unwrap_or("-"),
            entity_types = instance.dispatcher().table().len(),
            "Serving initial generation"
        );
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Currently published instance.
    pub fn active(&self) -> Arc<RouterInstance> {
        self.active.load_full()
    }

    /// Superseded instances still draining, oldest first.
    pub fn draining(&self) -> Vec<Arc<RouterInstance>> {
        let mut instances: Vec<_> = self.draining.iter().map(|e| Arc::clone(e.value())).collect();
        instances.sort_by_key(|i| i.generation().sequence);
        instances
    }

    /// Admit one request on the active generation.
    pub async fn acquire(&self) -> Result<ActiveRequest, LifecycleError> {
        for _ in 0..ACQUIRE_ATTEMPTS {
            if !self.state().is_ready() {
                return Err(LifecycleError::ShuttingDown);
            }
            let instance = self.active.load_full();
            if let Some(guard) = instance.try_accept() {
                return Ok(ActiveRequest {
                    instance,
                    _guard: guard,
                });
            }
            // Caught between drain and publish; the new pointer is imminent.
            tokio::task::yield_now().await;
        }
        Err(LifecycleError::NotAccepting)
    }

    /// Take the reload lock according to the concurrent reload policy.
    pub async fn begin_reload(&self) -> Result<ReloadPermit<'_>, LifecycleError> {
        let guard = match self.settings.concurrent_reload {
            ConcurrentReloadPolicy::Queue => self.reload_lock.lock().await,
            ConcurrentReloadPolicy::Reject => self
                .reload_lock
                .try_lock()
                .map_err(|_| LifecycleError::ConcurrentReload)?,
        };
        Ok(ReloadPermit { _guard: guard })
    }

    /// Build an instance for `config` and make it the active generation.
    pub async fn update_and_activate(
        self: &Arc<Self>,
        config: ExecutionConfig,
    ) -> Result<ReloadOutcome, LifecycleError> {
        let permit = self.begin_reload().await?;
        self.activate(&permit, config)
    }

    /// Swap in `config` while holding the reload permit.
    pub fn activate(
        self: &Arc<Self>,
        _permit: &ReloadPermit<'_>,
        config: ExecutionConfig,
    ) -> Result<ReloadOutcome, LifecycleError> {
        match self.state() {
            EngineState::Serving => {}
            EngineState::Draining | EngineState::Stopped => {
                return Err(LifecycleError::ShuttingDown)
            }
            other => {
                return Err(LifecycleError::NotServing {
                    state: other.as_str(),
                })
            }
        }

        let previous = self.active.load_full();
        if previous.generation().config_id == *config.id() {
            tracing::debug!(
                generation = %previous.generation(),
                "Execution config unchanged, skipping reload"
            );
            metrics::record_reload("unchanged");
            return Ok(ReloadOutcome::Unchanged(previous.generation().clone()));
        }

        self.transition(EngineState::Serving, EngineState::Reloading);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let next = match RouterInstance::build(sequence, Arc::new(config)) {
            Ok(instance) => instance,
            Err(e) => {
                self.transition(EngineState::Reloading, EngineState::Serving);
                metrics::record_reload("failed");
                return Err(e.into());
            }
        };

        previous.begin_drain();
        self.active.store(Arc::clone(&next));
        self.draining
            .insert(previous.generation().sequence, Arc::clone(&previous));
        self.transition(EngineState::Reloading, EngineState::Serving);

        metrics::record_reload("activated");
        metrics::set_active_generation(sequence);
        metrics::set_draining_instances(self.draining.len());
        tracing::info!(
            previous = %previous.generation(),
            current = %next.generation(),
            version = next.generation().version.as_deref().unwrap_or("-"),
            "Activated new generation"
        );

        self.spawn_drain(Arc::clone(&previous));
        Ok(ReloadOutcome::Activated {
            previous: previous.generation().clone(),
            current: next.generation().clone(),
        })
    }

    /// Mark the engine as failed; the caller is expected to shut down.
    pub fn mark_fatal(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, EngineState::Serving | EngineState::Reloading) {
                *state = EngineState::Fatal;
                true
            } else {
                false
            }
        });
    }

    /// Stop accepting, drain every instance and return within `deadline`.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), LifecycleError> {
        let started = Instant::now();
        let previous = self.state.send_replace(EngineState::Draining);
        if previous == EngineState::Stopped {
            self.state.send_replace(EngineState::Stopped);
            return Ok(());
        }
        tracing::info!(deadline = ?deadline, "Engine draining");

        // A reload in progress finishes first; anything queued behind it sees Draining.
        let _lock = tokio::time::timeout(deadline, self.reload_lock.lock()).await.ok();

        let mut instances = vec![self.active.load_full()];
        instances.extend(self.draining());
        for instance in &instances {
            instance.begin_drain();
        }

        let remaining = deadline.saturating_sub(started.elapsed());
        let drained = tokio::time::timeout(
            remaining,
            join_all(instances.iter().map(|instance| instance.wait_drained())),
        )
        .await
        .is_ok();

        let mut undrained = 0;
        for instance in &instances {
            if instance.status() != InstanceStatus::Drained {
                undrained += 1;
                instance.terminate();
            }
        }
        self.draining.clear();
        metrics::set_draining_instances(0);
        self.state.send_replace(EngineState::Stopped);

        if drained {
            tracing::info!(elapsed = ?started.elapsed(), "Engine stopped");
            Ok(())
        } else {
            Err(LifecycleError::ShutdownTimeout { undrained })
        }
    }

    fn spawn_drain(self: &Arc<Self>, instance: Arc<RouterInstance>) {
        let engine = Arc::clone(self);
        let grace = self.settings.drain_grace;
        tokio::spawn(async move {
            let generation = instance.generation().clone();
            match tokio::time::timeout(grace, instance.wait_drained()).await {
                Ok(()) => tracing::debug!(generation = %generation, "Generation drained"),
                Err(_) => {
                    tracing::warn!(
                        generation = %generation,
                        in_flight = instance.in_flight(),
                        grace = ?grace,
                        "Drain grace period elapsed, terminating generation"
                    );
                    instance.terminate();
                }
            }
            engine.draining.remove(&generation.sequence);
            metrics::set_draining_instances(engine.draining.len());
        });
    }

    fn transition(&self, from: EngineState, to: EngineState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> ExecutionConfig {
        let raw = format!(
            r#"{{
                "version": "{name}",
                "schema": {{ "types": {{ "Cosmo": {{ "fields": ["upc", "name"] }} }} }},
                "subgraphs": [ {{ "name": "products", "url": "http://localhost:4004/graphql" }} ],
                "entities": [ {{ "typename": "Cosmo", "key": "upc", "subgraph": "products",
                    "resolver": {{ "kind": "constant", "value": {{ "name": "{name}" }} }} }} ]
            }}"#
        );
        ExecutionConfig::from_slice(raw.as_bytes()).unwrap()
    }

    fn settings(policy: ConcurrentReloadPolicy) -> EngineSettings {
        EngineSettings {
            drain_grace: Duration::from_millis(200),
            concurrent_reload: policy,
        }
    }

    #[tokio::test]
    async fn start_serves_first_generation() {
        let engine = LifecycleEngine::start(config("a"), EngineSettings::default()).unwrap();
        assert_eq!(engine.state(), EngineState::Serving);
        assert_eq!(engine.active().generation().sequence, 1);
        assert!(engine.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn same_content_is_unchanged() {
        let engine = LifecycleEngine::start(config("a"), EngineSettings::default()).unwrap();
        let outcome = engine.update_and_activate(config("a")).await.unwrap();
        assert!(matches!(outcome, ReloadOutcome::Unchanged(ref g) if g.sequence == 1));
        assert!(engine.draining().is_empty());
    }

    #[tokio::test]
    async fn swap_drains_previous_generation() {
        let engine =
            LifecycleEngine::start(config("a"), settings(ConcurrentReloadPolicy::Queue)).unwrap();
        let held = engine.acquire().await.unwrap();

        let outcome = engine.update_and_activate(config("b")).await.unwrap();
        let ReloadOutcome::Activated { previous, current } = outcome else {
            panic!("expected activation");
        };
        assert_eq!((previous.sequence, current.sequence), (1, 2));

        let old = Arc::clone(held.instance());
        assert_eq!(old.status(), InstanceStatus::Draining);
        assert_eq!(engine.draining().len(), 1);

        let fresh = engine.acquire().await.unwrap();
        assert_eq!(fresh.instance().generation().sequence, 2);

        drop(held);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(old.status(), InstanceStatus::Drained);
        assert!(engine.draining().is_empty());
    }

    #[tokio::test]
    async fn busy_generation_is_terminated_after_grace() {
        let engine =
            LifecycleEngine::start(config("a"), settings(ConcurrentReloadPolicy::Queue)).unwrap();
        let held = engine.acquire().await.unwrap();
        engine.update_and_activate(config("b")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), held.instance().cancelled())
            .await
            .unwrap();
        assert_eq!(held.instance().status(), InstanceStatus::Terminated);
    }

    #[tokio::test]
    async fn reject_policy_refuses_overlapping_reload() {
        let engine =
            LifecycleEngine::start(config("a"), settings(ConcurrentReloadPolicy::Reject)).unwrap();
        let permit = engine.begin_reload().await.unwrap();

        let err = engine.update_and_activate(config("b")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ConcurrentReload));

        drop(permit);
        assert!(engine.update_and_activate(config("b")).await.is_ok());
    }

    #[tokio::test]
    async fn queue_policy_runs_reloads_in_order() {
        let engine =
            LifecycleEngine::start(config("a"), settings(ConcurrentReloadPolicy::Queue)).unwrap();
        let permit = engine.begin_reload().await.unwrap();

        let queued = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.update_and_activate(config("b")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!queued.is_finished());

        engine.activate(&permit, config("c")).unwrap();
        drop(permit);

        let outcome = queued.await.unwrap().unwrap();
        assert!(matches!(outcome, ReloadOutcome::Activated { ref current, .. } if current.sequence == 3));
        assert_eq!(engine.active().generation().version.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn shutdown_refuses_new_requests_and_reloads() {
        let engine = LifecycleEngine::start(config("a"), EngineSettings::default()).unwrap();
        engine.shutdown(Duration::from_secs(1)).await.unwrap();

        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(matches!(engine.acquire().await, Err(LifecycleError::ShuttingDown)));
        assert!(matches!(
            engine.update_and_activate(config("b")).await,
            Err(LifecycleError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn shutdown_returns_by_deadline() {
        let engine = LifecycleEngine::start(config("a"), EngineSettings::default()).unwrap();
        let held = engine.acquire().await.unwrap();

        let started = Instant::now();
        let err = engine.shutdown(Duration::from_millis(100)).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(matches!(err, LifecycleError::ShutdownTimeout { undrained: 1 }));
        assert_eq!(held.instance().status(), InstanceStatus::Terminated);
    }
}
