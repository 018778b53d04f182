//! DockerRuntime — bollard-backed implementation of [`ContainerRuntime`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerInspectResponse, ContainerSummary, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures::StreamExt;
use tracing::debug;

use scrapesync_core::EventAction;

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::{ContainerRuntime, LifecycleSignal, SignalStream, WorkloadSummary};

/// Label carried by compose-managed containers naming their service.
const COMPOSE_SERVICE_ATTRIBUTE: &str = "com.docker.compose.service";

/// Talks to the local Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect with the environment's default transport (socket or pipe).
    pub fn connect() -> RuntimeResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connect(e.to_string()))?;
        debug!("connected to docker daemon");
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_workloads(&self) -> RuntimeResult<Vec<WorkloadSummary>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String>::default()))
            .await
            .map_err(|e| RuntimeError::List(e.to_string()))?;

        Ok(containers.into_iter().filter_map(summary_from).collect())
    }

    async fn published_host_port(
        &self,
        workload_id: &str,
        container_port: &str,
        timeout: Duration,
    ) -> RuntimeResult<String> {
        let inspect = tokio::time::timeout(timeout, self.docker.inspect_container(workload_id, None))
            .await
            .map_err(|_| RuntimeError::InspectTimeout {
                workload_id: workload_id.to_string(),
            })?
            .map_err(|e| RuntimeError::Inspect {
                workload_id: workload_id.to_string(),
                reason: e.to_string(),
            })?;

        host_port_from(&inspect, container_port).ok_or_else(|| RuntimeError::PortNotPublished {
            workload_id: workload_id.to_string(),
            container_port: container_port.to_string(),
        })
    }

    fn lifecycle_stream(&self, opt_in_label: &str) -> SignalStream {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        filters.insert(
            "event".to_string(),
            EventAction::ALL.iter().map(|a| a.as_name().to_string()).collect(),
        );
        filters.insert("label".to_string(), vec![format!("{opt_in_label}=true")]);

        self.docker
            .events(Some(EventsOptions::<String> {
                filters,
                ..Default::default()
            }))
            .map(|item| {
                item.map(signal_from)
                    .map_err(|e| RuntimeError::Stream(e.to_string()))
            })
            .boxed()
    }
}

/// Flatten a container listing row; rows without an identifier are dropped.
fn summary_from(container: ContainerSummary) -> Option<WorkloadSummary> {
    let id = container.id?;
    let name = container
        .names
        .and_then(|names| names.into_iter().next())
        .map(|name| name.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.clone());

    Some(WorkloadSummary {
        id,
        name,
        labels: container.labels.unwrap_or_default(),
    })
}

/// Flatten a raw event message into a lifecycle signal.
fn signal_from(message: EventMessage) -> LifecycleSignal {
    let (workload_id, attributes) = match message.actor {
        Some(actor) => (
            actor.id.unwrap_or_default(),
            actor.attributes.unwrap_or_default(),
        ),
        None => (String::new(), HashMap::new()),
    };

    LifecycleSignal {
        action: message.action.unwrap_or_default(),
        workload_id,
        service_name: attributes.get(COMPOSE_SERVICE_ATTRIBUTE).cloned(),
        container_name: attributes.get("name").cloned(),
    }
}

/// Pull the first host port binding for `container_port` out of an inspect
/// response.
fn host_port_from(inspect: &ContainerInspectResponse, container_port: &str) -> Option<String> {
    inspect
        .network_settings
        .as_ref()?
        .ports
        .as_ref()?
        .get(container_port)?
        .as_ref()?
        .first()?
        .host_port
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{EventActor, NetworkSettings, PortBinding};

    fn inspect_with_ports(ports: bollard::models::PortMap) -> ContainerInspectResponse {
        ContainerInspectResponse {
            network_settings: Some(NetworkSettings {
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn host_port_resolves_first_binding() {
        let mut ports = bollard::models::PortMap::new();
        ports.insert(
            "2112/tcp".to_string(),
            Some(vec![
                PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some("32000".to_string()),
                },
                PortBinding {
                    host_ip: Some("::".to_string()),
                    host_port: Some("32001".to_string()),
                },
            ]),
        );

        let inspect = inspect_with_ports(ports);
        assert_eq!(host_port_from(&inspect, "2112/tcp"), Some("32000".to_string()));
    }

    #[test]
    fn host_port_absent_when_port_not_published() {
        let inspect = inspect_with_ports(bollard::models::PortMap::new());
        assert_eq!(host_port_from(&inspect, "2112/tcp"), None);

        // Port key present but with no bindings.
        let mut ports = bollard::models::PortMap::new();
        ports.insert("2112/tcp".to_string(), None);
        let inspect = inspect_with_ports(ports);
        assert_eq!(host_port_from(&inspect, "2112/tcp"), None);
    }

    #[test]
    fn host_port_absent_without_network_settings() {
        let inspect = ContainerInspectResponse::default();
        assert_eq!(host_port_from(&inspect, "2112/tcp"), None);
    }

    #[test]
    fn summary_strips_leading_slash_from_name() {
        let summary = summary_from(ContainerSummary {
            id: Some("abc123".to_string()),
            names: Some(vec!["/svc-a".to_string()]),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(summary.id, "abc123");
        assert_eq!(summary.name, "svc-a");
    }

    #[test]
    fn summary_falls_back_to_id_without_names() {
        let summary = summary_from(ContainerSummary {
            id: Some("abc123".to_string()),
            names: None,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(summary.name, "abc123");
    }

    #[test]
    fn summary_drops_rows_without_id() {
        assert!(summary_from(ContainerSummary::default()).is_none());
    }

    #[test]
    fn signal_carries_service_and_container_name() {
        let mut attributes = HashMap::new();
        attributes.insert(COMPOSE_SERVICE_ATTRIBUTE.to_string(), "svc-a".to_string());
        attributes.insert("name".to_string(), "project-svc-a-1".to_string());

        let signal = signal_from(EventMessage {
            action: Some("die".to_string()),
            actor: Some(EventActor {
                id: Some("w1".to_string()),
                attributes: Some(attributes),
            }),
            ..Default::default()
        });

        assert_eq!(signal.action, "die");
        assert_eq!(signal.workload_id, "w1");
        assert_eq!(signal.service_name.as_deref(), Some("svc-a"));
        assert_eq!(signal.container_name.as_deref(), Some("project-svc-a-1"));
    }

    #[test]
    fn signal_tolerates_missing_actor() {
        let signal = signal_from(EventMessage::default());
        assert!(signal.action.is_empty());
        assert!(signal.workload_id.is_empty());
        assert!(signal.service_name.is_none());
    }
}
