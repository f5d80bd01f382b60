// src/monitor.rs

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sysinfo::System;
use tracing::{info, warn};

const MIB: u64 = 1024 * 1024;

/// Background reporter of system memory use while a run is in flight.
///
/// Purely informational: if it cannot start, the run carries on without it.
/// Dropping the handle stops the thread.
pub struct ResourceMonitor {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    pub fn spawn(interval: Duration) -> Option<Self> {
        let (tx, rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("resource-monitor".into())
            .spawn(move || {
                let mut sys = System::new();
                loop {
                    match rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            sys.refresh_memory();
                            info!(
                                used_mib = sys.used_memory() / MIB,
                                total_mib = sys.total_memory() / MIB,
                                "memory"
                            );
                        }
                        // stop requested or handle dropped
                        _ => break,
                    }
                }
            });

        match spawned {
            Ok(handle) => Some(Self {
                stop: Some(tx),
                handle: Some(handle),
            }),
            Err(e) => {
                warn!("resource monitor unavailable: {}", e);
                None
            }
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_drop_stops_promptly() {
        let monitor = ResourceMonitor::spawn(Duration::from_secs(3600)).expect("thread spawn");
        let start = Instant::now();
        drop(monitor);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
