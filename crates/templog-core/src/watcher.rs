//! Port watcher
//!
//! Periodically rescans serial ports and removable drives on a background
//! tokio task. The first scan is always published; after that only changes
//! are.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::Disks;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::protocol::{discover_ports, DiscoveryPolicy, PortInfo};

/// One observation of the machine's ports and drives
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortSnapshot {
    /// Serial ports, in discovery order
    pub ports: Vec<PortInfo>,
    /// Mount points of removable drives (datalogger SD cards, USB sticks)
    pub removable_drives: Vec<PathBuf>,
}

/// Mount points of currently attached removable drives
pub fn removable_drives() -> Vec<PathBuf> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|d| d.is_removable())
        .map(|d| d.mount_point().to_path_buf())
        .collect()
}

/// Take one snapshot. Blocks while ports are probed.
pub fn scan(policy: DiscoveryPolicy) -> PortSnapshot {
    PortSnapshot {
        ports: discover_ports(policy),
        removable_drives: removable_drives(),
    }
}

/// Handle to a running watcher task; the task stops when this is dropped
pub struct PortWatcher {
    task: JoinHandle<()>,
    rx: watch::Receiver<PortSnapshot>,
}

impl PortWatcher {
    /// Start scanning every `interval`. Must be called inside a tokio runtime.
    pub fn spawn(policy: DiscoveryPolicy, interval: Duration) -> Self {
        Self::spawn_with(interval, move || scan(policy))
    }

    /// Start a watcher with a custom scan function
    pub fn spawn_with<F>(interval: Duration, scan_fn: F) -> Self
    where
        F: Fn() -> PortSnapshot + Send + Sync + Clone + 'static,
    {
        let (tx, rx) = watch::channel(PortSnapshot::default());
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut first = true;
            loop {
                ticker.tick().await;
                let scan_fn = scan_fn.clone();
                let snapshot = match tokio::task::spawn_blocking(scan_fn).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!("port scan failed: {e}");
                        continue;
                    }
                };
                let changed = tx.send_if_modified(|current| {
                    if !first && *current == snapshot {
                        false
                    } else {
                        *current = snapshot;
                        true
                    }
                });
                if changed {
                    debug!("port snapshot changed");
                }
                first = false;
                if tx.is_closed() {
                    break;
                }
            }
        });
        Self { task, rx }
    }

    /// Receiver that sees every changed snapshot
    pub fn subscribe(&self) -> watch::Receiver<PortSnapshot> {
        self.rx.clone()
    }

    /// Latest snapshot
    pub fn current(&self) -> PortSnapshot {
        self.rx.borrow().clone()
    }

    /// Stop the task
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PortWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_watcher_publishes_changes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let watcher = PortWatcher::spawn_with(Duration::from_millis(10), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            PortSnapshot {
                ports: vec![PortInfo::named(format!("COM{}", n.min(2)))],
                removable_drives: Vec::new(),
            }
        });

        let mut rx = watcher.subscribe();
        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                rx.changed().await.unwrap();
                let snapshot = rx.borrow_and_update().clone();
                if snapshot.ports[0].name == "COM2" {
                    return snapshot;
                }
            }
        })
        .await
        .expect("watcher should publish COM2");

        assert_eq!(seen.ports.len(), 1);
        assert!(calls.load(Ordering::SeqCst) >= 3);
        watcher.stop();
    }

    #[tokio::test]
    async fn test_empty_first_scan_is_published() {
        let watcher = PortWatcher::spawn_with(Duration::from_millis(10), PortSnapshot::default);
        let mut rx = watcher.subscribe();

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("first scan should be published")
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), PortSnapshot::default());

        // unchanged scans stay quiet
        let again = tokio::time::timeout(Duration::from_millis(100), rx.changed()).await;
        assert!(again.is_err());
        watcher.stop();
    }
}
