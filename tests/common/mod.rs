//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use federation_router::config::{ReloadFailurePolicy, RouterConfig};
use federation_router::execution::{ConfigChange, FileConfigSource};
use federation_router::lifecycle::{Gateway, SignalGate};
use tokio::sync::mpsc;

/// The products subgraph demo config.
pub const FIXTURE: &str = include_str!("../../demos/execution-config.json");

pub const ADMIN_KEY: &str = "test-admin-key";

/// The fixture with a different `version`, so it hashes to a new generation.
pub fn fixture_version(version: &str) -> String {
    FIXTURE.replacen("\"products-demo\"", &format!("\"{version}\""), 1)
}

/// Write `contents` as the execution config inside `dir`.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("execution-config.json");
    std::fs::write(&path, contents).unwrap();
    path
}

/// Router config bound to an ephemeral port with short drain windows.
pub fn router_config(path: &Path) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.execution_config.path = Some(path.to_path_buf());
    config.execution_config.watch = false;
    config.lifecycle.shutdown_delay_secs = 2;
    config.lifecycle.drain_grace_secs = 1;
    config.lifecycle.on_reload_failure = ReloadFailurePolicy::KeepPrevious;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

/// A started gateway plus the sender feeding its reload loop.
pub struct Harness {
    pub gateway: Gateway,
    pub changes: mpsc::UnboundedSender<ConfigChange>,
    pub path: PathBuf,
}

impl Harness {
    pub async fn start(config: &RouterConfig) -> Self {
        let path = config.execution_config.path.clone().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(FileConfigSource::new(path.clone()));
        let gateway = Gateway::start(config, source, Some(rx), SignalGate::new())
            .await
            .unwrap();
        Self {
            gateway,
            changes: tx,
            path,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.gateway.local_addr(), path)
    }

    /// Overwrite the execution config and tell the reload loop about it.
    pub fn rewrite(&self, contents: &str) {
        std::fs::write(&self.path, contents).unwrap();
        self.changes.send(ConfigChange::new(self.path.clone())).unwrap();
    }

    /// Wait until the active generation reaches `sequence`.
    pub async fn wait_for_generation(&self, sequence: u64) {
        let engine = self.gateway.engine();
        tokio::time::timeout(Duration::from_secs(5), async {
            while engine.active().generation().sequence < sequence {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("generation was never activated");
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn entities_body(representations: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "query": "query($representations: [_Any!]!) { _entities(representations: $representations) { ... on Employee { products notes } } }",
        "variables": { "representations": representations },
    })
}
