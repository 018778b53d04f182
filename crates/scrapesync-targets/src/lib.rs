//! scrapesync-targets — persisted scrape-target state.
//!
//! Owns the subset of the Prometheus configuration this system reads and
//! writes: a global scrape interval plus one `scrape_configs` entry per
//! published job, each with exactly one static config holding exactly one
//! address. The file is the single source of truth between reconciliation
//! cycles and across process restarts: each cycle loads it, applies the
//! drained events, and rewrites it in full.
//!
//! A missing file is an empty target set (first run); any other read or
//! parse failure is surfaced so the reconciler can abort the cycle rather
//! than publish from a corrupt baseline.

pub mod error;
pub mod file;
pub mod schema;

pub use error::{TargetsError, TargetsResult};
pub use file::{TargetMap, TargetsFile};
