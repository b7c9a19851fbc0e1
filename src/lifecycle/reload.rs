//! Hot reload loop.
//!
//! # Data Flow
//! ```text
//! ConfigWatcher (notify thread)
//!     → mpsc channel of ConfigChange
//!     → coalesce the burst one write produces
//!     → engine.begin_reload() (queue | reject)
//!     → source.reload(change) on the blocking pool
//!     → engine.activate()
//!     → failure: keep previous generation | trigger ReloadFailed
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::ReloadFailurePolicy;
use crate::execution::{ConfigChange, ConfigLoadError, ConfigSource};
use crate::lifecycle::engine::{LifecycleEngine, ReloadOutcome};
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::signals::{ShutdownReason, SignalGate};
use crate::observability::metrics;

/// Editors and `cp` emit several events per save; wait this long for the
/// burst to settle before reading the file.
const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Read the change and activate it under the reload permit.
///
/// Sources read synchronously, so the read runs on the blocking pool and
/// request handling keeps its worker threads while the permit is held.
pub async fn handle_change(
    engine: &Arc<LifecycleEngine>,
    source: Arc<dyn ConfigSource>,
    change: &ConfigChange,
) -> Result<ReloadOutcome, LifecycleError> {
    let permit = engine.begin_reload().await?;
    let read = change.clone();
    let config = tokio::task::spawn_blocking(move || source.reload(&read))
        .await
        .unwrap_or_else(|e| {
            Err(ConfigLoadError::Io {
                path: change.path().to_path_buf(),
                source: std::io::Error::other(e),
            })
        })
        .inspect_err(|_| metrics::record_reload("failed"))?;
    engine.activate(&permit, config)
}

/// Apply change notifications until the gate closes or the stream ends.
pub async fn run_reload_loop(
    engine: Arc<LifecycleEngine>,
    source: Arc<dyn ConfigSource>,
    mut changes: mpsc::UnboundedReceiver<ConfigChange>,
    policy: ReloadFailurePolicy,
    gate: SignalGate,
) {
    loop {
        let mut change = tokio::select! {
            _ = gate.cancelled() => break,
            change = changes.recv() => match change {
                Some(change) => change,
                None => {
                    tracing::debug!("Execution config change stream closed");
                    break;
                }
            },
        };

        tokio::select! {
            _ = gate.cancelled() => break,
            _ = tokio::time::sleep(SETTLE_DELAY) => {}
        }
        while let Ok(newer) = changes.try_recv() {
            change = newer;
        }

        let span = tracing::info_span!("reload", path = %change.path().display());
        let result = handle_change(&engine, Arc::clone(&source), &change)
            .instrument(span)
            .await;

        match result {
            Ok(ReloadOutcome::Activated { current, .. }) => {
                tracing::info!(
                    generation = %current,
                    latency = ?change.observed_at().elapsed(),
                    "Reload complete"
                );
            }
            Ok(ReloadOutcome::Unchanged(_)) => {}
            Err(LifecycleError::ShuttingDown) => break,
            Err(LifecycleError::ConcurrentReload) => {
                tracing::warn!("Reload rejected, another reload is in progress");
            }
            Err(e) => match policy {
                ReloadFailurePolicy::KeepPrevious => {
                    tracing::error!(
                        error = %e,
                        generation = %engine.active().generation(),
                        "Reload failed, keeping previous generation"
                    );
                }
                ReloadFailurePolicy::Exit => {
                    tracing::error!(error = %e, "Reload failed, shutting down");
                    engine.mark_fatal();
                    gate.trigger(ShutdownReason::ReloadFailed);
                    break;
                }
            },
        }
    }
    tracing::debug!("Reload loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Instant;

    use crate::execution::ExecutionConfig;
    use crate::lifecycle::engine::EngineSettings;

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

    /// A source whose read holds its thread, like a slow disk.
    struct SlowSource {
        delay: Duration,
        version: &'static str,
    }

    impl ConfigSource for SlowSource {
        fn load(&self) -> Result<ExecutionConfig, ConfigLoadError> {
            std::thread::sleep(self.delay);
            Ok(config(self.version))
        }
    }

    struct PanickingSource;

    impl ConfigSource for PanickingSource {
        fn load(&self) -> Result<ExecutionConfig, ConfigLoadError> {
            panic!("source failed");
        }
    }

    fn change() -> ConfigChange {
        ConfigChange::new(PathBuf::from("execution-config.json"))
    }

    #[tokio::test]
    async fn slow_reads_leave_the_runtime_free() {
        let engine = LifecycleEngine::start(config("a"), EngineSettings::default()).unwrap();
        let source: Arc<dyn ConfigSource> = Arc::new(SlowSource {
            delay: Duration::from_millis(300),
            version: "b",
        });

        let started = Instant::now();
        let ticker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            started.elapsed()
        });

        let outcome = handle_change(&engine, source, &change()).await.unwrap();
        let ticked = ticker.await.unwrap();

        assert!(ticked < Duration::from_millis(200), "timer waited {ticked:?}");
        assert!(matches!(outcome, ReloadOutcome::Activated { .. }));
        assert_eq!(engine.active().generation().sequence, 2);
    }

    #[tokio::test]
    async fn failed_read_task_keeps_previous_generation() {
        let engine = LifecycleEngine::start(config("a"), EngineSettings::default()).unwrap();

        let err = handle_change(&engine, Arc::new(PanickingSource), &change())
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::ConfigLoad(ConfigLoadError::Io { .. })));
        assert_eq!(engine.active().generation().sequence, 1);
    }
}
