//! The `ContainerRuntime` trait — what scrapesync consumes from the runtime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::RuntimeResult;

/// One row of a workload listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSummary {
    /// Opaque stable identifier of the workload instance.
    pub id: String,
    /// Primary name, without the runtime's leading `/`.
    pub name: String,
    /// All labels on the workload.
    pub labels: HashMap<String, String>,
}

/// One raw item of the lifecycle event stream, before translation into a
/// domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSignal {
    /// The runtime's action name (e.g. `"start"`, `"die"`).
    pub action: String,
    /// Workload identifier; empty if the runtime omitted the actor.
    pub workload_id: String,
    /// Compose service name, when the workload carries one.
    pub service_name: Option<String>,
    /// Container name attribute, when present.
    pub container_name: Option<String>,
}

/// The lifecycle subscription: a long-lived stream of signals interleaved
/// with transport errors.
pub type SignalStream = BoxStream<'static, RuntimeResult<LifecycleSignal>>;

/// The runtime collaborator consumed by producers and the reconciler.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List all currently running workloads.
    async fn list_workloads(&self) -> RuntimeResult<Vec<WorkloadSummary>>;

    /// Resolve the host port that `container_port` (e.g. `"2112/tcp"`) is
    /// published on for the given workload, within `timeout`.
    async fn published_host_port(
        &self,
        workload_id: &str,
        container_port: &str,
        timeout: Duration,
    ) -> RuntimeResult<String>;

    /// Open the lifecycle subscription, filtered server-side to container
    /// events with a recognized action and the opt-in label set to true.
    fn lifecycle_stream(&self, opt_in_label: &str) -> SignalStream;
}
