//! Error types for the container runtime boundary.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur talking to the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to connect to container runtime: {0}")]
    Connect(String),

    #[error("failed to list workloads: {0}")]
    List(String),

    #[error("failed to inspect workload {workload_id}: {reason}")]
    Inspect { workload_id: String, reason: String },

    #[error("inspecting workload {workload_id} timed out")]
    InspectTimeout { workload_id: String },

    #[error("workload {workload_id} does not publish port {container_port}")]
    PortNotPublished {
        workload_id: String,
        container_port: String,
    },

    #[error("lifecycle event stream error: {0}")]
    Stream(String),
}
