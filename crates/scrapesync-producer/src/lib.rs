//! scrapesync-producer — the event-producing half of the pipeline.
//!
//! Two producers feed the shared [`EventLog`](scrapesync_core::EventLog),
//! run strictly in order by the [`ProducerManager`]:
//!
//! 1. [`SnapshotProducer`] runs once and seeds the log with a synthetic
//!    `Running` event for every opted-in workload that is already up, so a
//!    fresh process knows about workloads that predate it.
//! 2. [`StreamProducer`] then owns the task forever, translating raw
//!    lifecycle signals into events as they arrive.
//!
//! Producers are infallible by contract: every failure is logged and skips
//! only the affected unit of work.

pub mod manager;
pub mod snapshot;
pub mod stream;

pub use manager::{Producer, ProducerManager};
pub use snapshot::SnapshotProducer;
pub use stream::StreamProducer;
