//! Load harness: many simulated users uploading concurrently.
//!
//! Every user gets its own task and its own session; a failing session never
//! touches another. Results come back through the join set and are
//! aggregated into a [`LoadReport`].

use std::collections::BTreeSet;
use std::sync::Arc;

use capyprobe_transfer::PayloadSource;
use capyprobe_upload_api::UploadTransport;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::controller::ResumeController;
use crate::fault::FaultInjector;
use crate::monitor::{LoadCounters, ResourceMonitor};
use crate::types::{HarnessConfig, LoadReport, SessionResult};

/// Spawns one resume controller per simulated user and collects results.
pub struct LoadHarness {
    config: Arc<HarnessConfig>,
    transport: Arc<dyn UploadTransport>,
    faults: Arc<dyn FaultInjector>,
    payload: Arc<PayloadSource>,
    counters: Arc<LoadCounters>,
}

impl LoadHarness {
    pub fn new(
        config: HarnessConfig,
        transport: Arc<dyn UploadTransport>,
        faults: Arc<dyn FaultInjector>,
        payload: PayloadSource,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            faults,
            payload: Arc::new(payload),
            counters: Arc::default(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Session counters, cumulative over every run of this harness.
    pub fn counters(&self) -> &LoadCounters {
        &self.counters
    }

    /// Runs every session to completion and reports the aggregate.
    ///
    /// Session starts are staggered by `config.stagger`. The resource
    /// monitor runs for the duration and is stopped, not awaited, at the end.
    pub async fn run(&self) -> LoadReport {
        let num_users = self.config.num_users;
        let monitor =
            ResourceMonitor::start(self.config.monitor_interval, Arc::clone(&self.counters));

        info!(
            users = num_users,
            payload_bytes = self.payload.len(),
            chunk_size = self.config.session.chunk_size,
            "starting load run"
        );

        let mut workers = JoinSet::new();
        for user_id in 0..num_users {
            if user_id > 0 && !self.config.stagger.is_zero() {
                tokio::time::sleep(self.config.stagger).await;
            }

            let config = Arc::clone(&self.config);
            let transport = Arc::clone(&self.transport);
            let faults = Arc::clone(&self.faults);
            let payload = Arc::clone(&self.payload);
            let counters = Arc::clone(&self.counters);

            workers.spawn(async move {
                counters.session_started();
                let ctrl = ResumeController::new(
                    transport.as_ref(),
                    faults.as_ref(),
                    payload.as_ref(),
                    &config.session,
                );
                let result = ctrl.run(user_id, &config.object_name(user_id)).await;
                counters.session_finished(result.succeeded);
                result
            });
            debug!(user = user_id, "session spawned");
        }

        let mut results = Vec::with_capacity(num_users);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "session worker ended abnormally"),
            }
        }

        // Every user reports exactly once, even if its worker died.
        let reported: BTreeSet<usize> = results.iter().map(|r| r.user_id).collect();
        for user_id in (0..num_users).filter(|id| !reported.contains(id)) {
            self.counters.session_finished(false);
            results.push(SessionResult::lost(user_id, "session worker ended abnormally"));
        }

        monitor.stop();

        let report = LoadReport::new(results);
        info!(
            succeeded = report.succeeded(),
            total = report.total(),
            resumes = report.resumes(),
            "load run finished"
        );
        report
    }
}
