//! Producer manager — runs the producers strictly in order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use scrapesync_core::EventLog;
use scrapesync_docker::ContainerRuntime;

use crate::snapshot::SnapshotProducer;
use crate::stream::StreamProducer;

/// Something that feeds the event log.
///
/// Infallible by contract: producers handle their own failures internally
/// and never propagate them to the manager.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, log: &EventLog);
}

/// Owns the ordered producer list: snapshot first, then the stream.
///
/// `run` executes them in order on the calling task. Because the stream
/// producer holds its subscription open, `run` only returns if that
/// subscription ends.
pub struct ProducerManager {
    producers: Vec<Box<dyn Producer>>,
}

impl ProducerManager {
    /// The standard pair: snapshot seeding, then the permanent stream.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, opt_in_label: &str) -> Self {
        Self {
            producers: vec![
                Box::new(SnapshotProducer::new(runtime.clone(), opt_in_label)),
                Box::new(StreamProducer::new(runtime, opt_in_label)),
            ],
        }
    }

    /// A manager over an explicit producer list (tests).
    pub fn with_producers(producers: Vec<Box<dyn Producer>>) -> Self {
        Self { producers }
    }

    /// Run every producer to completion, in order.
    pub async fn run(&self, log: &EventLog) {
        for (index, producer) in self.producers.iter().enumerate() {
            debug!(index, "producer starting");
            producer.produce(log).await;
        }
    }
}
