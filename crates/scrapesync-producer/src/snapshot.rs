//! Snapshot producer — seeds the log with the present-state baseline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use scrapesync_core::{Event, EventAction, EventLog};
use scrapesync_docker::ContainerRuntime;

use crate::manager::Producer;

/// Lists the currently running workloads once and emits a synthetic
/// `Running` event for each one that opts in via the label.
pub struct SnapshotProducer {
    runtime: Arc<dyn ContainerRuntime>,
    opt_in_label: String,
}

impl SnapshotProducer {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, opt_in_label: impl Into<String>) -> Self {
        Self {
            runtime,
            opt_in_label: opt_in_label.into(),
        }
    }
}

#[async_trait]
impl Producer for SnapshotProducer {
    async fn produce(&self, log: &EventLog) {
        let workloads = match self.runtime.list_workloads().await {
            Ok(workloads) => workloads,
            Err(e) => {
                error!(error = %e, "snapshot listing failed, seeding nothing");
                return;
            }
        };

        let mut seeded = 0usize;
        for workload in workloads {
            let Some(raw) = workload.labels.get(&self.opt_in_label) else {
                continue;
            };
            match raw.parse::<bool>() {
                Ok(true) => {
                    log.push(Event::new(EventAction::Running, &workload.id, &workload.name));
                    seeded += 1;
                }
                Ok(false) => {}
                Err(_) => {
                    warn!(
                        workload = %workload.name,
                        value = %raw,
                        "opt-in label is not a boolean, skipping workload"
                    );
                }
            }
        }

        info!(seeded, "snapshot producer seeded event log");
    }
}
