//! Canned in-memory runtime for tests and local development.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::{ContainerRuntime, LifecycleSignal, SignalStream, WorkloadSummary};

/// A [`ContainerRuntime`] with a fixed workload set, fixed port mappings,
/// and a scripted lifecycle stream.
///
/// The stream plays the scripted items once and then ends, which is what
/// stream-producer and end-to-end tests want: drive the pipeline with a
/// known sequence, then let it settle.
#[derive(Default)]
pub struct StaticRuntime {
    workloads: Vec<WorkloadSummary>,
    host_ports: HashMap<(String, String), String>,
    script: Mutex<Vec<RuntimeResult<LifecycleSignal>>>,
    fail_listing: bool,
}

impl StaticRuntime {
    /// An empty runtime: no workloads, no ports, an immediately-ended stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a running workload to the listing.
    pub fn with_workload(
        mut self,
        id: &str,
        name: &str,
        labels: &[(&str, &str)],
    ) -> Self {
        self.workloads.push(WorkloadSummary {
            id: id.to_string(),
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    /// Publish `container_port` of `workload_id` on `host_port`.
    pub fn with_host_port(mut self, workload_id: &str, container_port: &str, host_port: &str) -> Self {
        self.host_ports.insert(
            (workload_id.to_string(), container_port.to_string()),
            host_port.to_string(),
        );
        self
    }

    /// Append a signal to the scripted stream.
    pub fn with_signal(self, signal: LifecycleSignal) -> Self {
        self.lock().push(Ok(signal));
        self
    }

    /// Append a transport error to the scripted stream.
    pub fn with_stream_error(self, reason: &str) -> Self {
        self.lock().push(Err(RuntimeError::Stream(reason.to_string())));
        self
    }

    /// Make `list_workloads` fail.
    pub fn with_listing_failure(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RuntimeResult<LifecycleSignal>>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContainerRuntime for StaticRuntime {
    async fn list_workloads(&self) -> RuntimeResult<Vec<WorkloadSummary>> {
        if self.fail_listing {
            return Err(RuntimeError::List("listing unavailable".to_string()));
        }
        Ok(self.workloads.clone())
    }

    async fn published_host_port(
        &self,
        workload_id: &str,
        container_port: &str,
        _timeout: Duration,
    ) -> RuntimeResult<String> {
        self.host_ports
            .get(&(workload_id.to_string(), container_port.to_string()))
            .cloned()
            .ok_or_else(|| RuntimeError::PortNotPublished {
                workload_id: workload_id.to_string(),
                container_port: container_port.to_string(),
            })
    }

    fn lifecycle_stream(&self, _opt_in_label: &str) -> SignalStream {
        let script = std::mem::take(&mut *self.lock());
        futures::stream::iter(script).boxed()
    }
}

/// Shorthand for building a [`LifecycleSignal`] in tests.
pub fn signal(action: &str, workload_id: &str, service_name: Option<&str>) -> LifecycleSignal {
    LifecycleSignal {
        action: action.to_string(),
        workload_id: workload_id.to_string(),
        service_name: service_name.map(str::to_string),
        container_name: None,
    }
}
