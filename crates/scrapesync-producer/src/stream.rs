//! Stream producer — the permanent owner of the lifecycle subscription.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{error, info, warn};

use scrapesync_core::{Event, EventAction, EventLog};
use scrapesync_docker::{ContainerRuntime, LifecycleSignal};

use crate::manager::Producer;

/// Subscribes to the runtime's lifecycle stream and pushes one event per
/// recognized signal until the subscription ends.
///
/// Transport errors are logged and the loop continues. If the stream
/// itself ends, `produce` returns; reestablishing the subscription is the
/// process supervisor's job, not this loop's.
pub struct StreamProducer {
    runtime: Arc<dyn ContainerRuntime>,
    opt_in_label: String,
}

impl StreamProducer {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, opt_in_label: impl Into<String>) -> Self {
        Self {
            runtime,
            opt_in_label: opt_in_label.into(),
        }
    }
}

#[async_trait]
impl Producer for StreamProducer {
    async fn produce(&self, log: &EventLog) {
        let mut stream = self.runtime.lifecycle_stream(&self.opt_in_label);
        info!(label = %self.opt_in_label, "lifecycle subscription opened");

        while let Some(item) = stream.next().await {
            match item {
                Ok(signal) => {
                    if let Some(event) = translate(signal) {
                        log.push(event);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "lifecycle stream error, continuing");
                }
            }
        }

        error!("lifecycle stream ended");
    }
}

/// Translate a raw signal into a domain event.
///
/// Signals with an unrecognized action, no workload identifier, or no
/// usable name are dropped with a log line; they must never reach the
/// reconciler as a state transition.
fn translate(signal: LifecycleSignal) -> Option<Event> {
    let Some(action) = EventAction::from_name(&signal.action) else {
        warn!(action = %signal.action, "unrecognized lifecycle action, dropping signal");
        return None;
    };

    if signal.workload_id.is_empty() {
        warn!(action = %signal.action, "signal without workload identifier, dropping");
        return None;
    }

    // Prefer the compose service name; fall back to the container name so
    // plain containers still publish under a stable job key.
    let Some(name) = signal.service_name.or(signal.container_name) else {
        warn!(workload_id = %signal.workload_id, "signal without a usable name, dropping");
        return None;
    };

    Some(Event::new(action, signal.workload_id, name))
}
