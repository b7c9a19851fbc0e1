//! Execution config file watcher for hot reload.
//!
//! The watcher only reports that the file changed; reading and compiling the
//! new content is left to the reload loop so that a slow or broken file
//! never blocks the notify callback thread.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::execution::source::ConfigChange;

/// A watcher that monitors the execution config file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    poll_interval: Duration,
    change_tx: mpsc::UnboundedSender<ConfigChange>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for change notifications. Delivery
    /// is at-least-once: one write may produce several notifications.
    pub fn new(
        path: &Path,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ConfigChange>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                poll_interval,
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching the file on the notify backend thread.
    ///
    /// The returned handle must be kept alive for as long as notifications
    /// are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = %path.display(), "Execution config file has been written");
                        let _ = tx.send(ConfigChange::new(path.clone()));
                    }
                }
                Err(e) => tracing::error!(error = %e, "Error watching for execution config changes"),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Watching for changes to execution config");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reports_writes_to_the_watched_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let (watcher, mut changes) = ConfigWatcher::new(file.path(), Duration::from_millis(50));
        let _handle = watcher.run().unwrap();

        writeln!(file, "{{}}").unwrap();
        file.flush().unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .expect("no change notification")
            .expect("channel closed");
        assert_eq!(change.path(), file.path());
    }

    #[test]
    fn missing_file_cannot_be_watched() {
        let (watcher, _changes) = ConfigWatcher::new(
            Path::new("/definitely/not/here.json"),
            Duration::from_millis(50),
        );
        assert!(watcher.run().is_err());
    }
}
