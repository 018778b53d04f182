//! scrapesync-reconcile — the consuming half of the pipeline.
//!
//! On a fixed interval the [`Reconciler`] drains the event log, coalesces
//! duplicate signals per workload (last one wins), diffs the result
//! against the persisted target state, rewrites the target file, and
//! signals the downstream reloader.
//!
//! # Cycle
//!
//! ```text
//! flush ──> coalesce ──> load state ──> diff ──> publish ──> reload POST
//!   │                        │
//!   └── empty? no-op         └── unreadable? abort cycle, write nothing
//! ```
//!
//! Each cycle is a pure function of (drained events, persisted state);
//! nothing is carried across cycles except through the file, so a cycle is
//! idempotent against state produced by a prior run or edited externally.

pub mod reconciler;
pub mod reload;

pub use reconciler::{coalesce, ReconcileConfig, Reconciler};
pub use reload::{ReloadClient, ReloadError};
