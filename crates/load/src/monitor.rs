//! Background resource monitor for a load run.
//!
//! Logs session counters and process memory at a fixed interval until
//! stopped. Purely observational: nothing reads what it logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Session counters shared between the harness and the monitor.
#[derive(Debug, Default)]
pub struct LoadCounters {
    started: AtomicUsize,
    finished: AtomicUsize,
    succeeded: AtomicUsize,
}

impl LoadCounters {
    pub fn session_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_finished(&self, succeeded: bool) {
        self.finished.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns `(started, finished, succeeded)`.
    pub fn snapshot(&self) -> (usize, usize, usize) {
        (
            self.started.load(Ordering::Relaxed),
            self.finished.load(Ordering::Relaxed),
            self.succeeded.load(Ordering::Relaxed),
        )
    }
}

/// Handle to a running monitor task.
pub struct ResourceMonitor {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ResourceMonitor {
    /// Spawns the monitor loop. Minimum interval is 100 ms.
    pub fn start(interval: Duration, counters: Arc<LoadCounters>) -> Self {
        let interval = interval.max(Duration::from_millis(100));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(interval, counters, cancel.clone()));
        tracing::debug!(
            interval_ms = interval.as_millis() as u64,
            "resource monitor started"
        );
        Self { cancel, handle }
    }

    /// Signals the loop to stop without waiting for it.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` until the loop has exited.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn monitor_loop(interval: Duration, counters: Arc<LoadCounters>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Skip the first immediate tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let (started, finished, succeeded) = counters.snapshot();
                tracing::info!(
                    started,
                    in_flight = started.saturating_sub(finished),
                    finished,
                    succeeded,
                    rss_kib = resident_set_kib(),
                    "monitoring"
                );
            }
        }
    }
}

/// Resident set size of this process in KiB, where the platform exposes it.
#[cfg(target_os = "linux")]
fn resident_set_kib() -> Option<u64> {
    const PAGE_SIZE_KIB: u64 = 4;
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * PAGE_SIZE_KIB)
}

#[cfg(not(target_os = "linux"))]
fn resident_set_kib() -> Option<u64> {
    None
}
