//! scrapesync-core — shared domain types for scrapesync.
//!
//! The vocabulary the whole pipeline speaks: lifecycle [`Event`]s and the
//! [`EventLog`] they flow through.
//!
//! # Architecture
//!
//! ```text
//! SnapshotProducer ─┐
//!                   ├── push() ──> EventLog ── flush() ──> Reconciler
//! StreamProducer  ──┘
//! ```
//!
//! The `EventLog` is the only shared mutable state in the process. Producers
//! append, the reconciler drains; both run on their own task for the process
//! lifetime and never communicate any other way.

pub mod event;
pub mod log;

pub use event::{epoch_secs, Event, EventAction};
pub use log::EventLog;
