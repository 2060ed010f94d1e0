#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Arbihawk
//!
//! Façade crate re-exporting the Arbihawk ecosystem's library crates under
//! organised namespaces, for callers who prefer a single dependency over
//! the full workspace.

pub use arbihawk_core as core;
pub use arbihawk_identity as identity;
pub use arbihawk_ingest as ingest;
pub use arbihawk_instrument as instrument;
pub use arbihawk_markets as markets;
pub use arbihawk_matcher as matcher;
pub use arbihawk_models as models;
pub use arbihawk_risk as risk;
pub use arbihawk_settlement as settlement;
pub use arbihawk_store as store;
pub use arbihawk_strategies as strategies;
pub use arbihawk_validate as validate;

// Flat re-export of the symbols most callers reach for first.
pub use arbihawk_core::{Scheduler, SchedulerConfig, SchedulerDeps, TaskKind, TaskResult};
pub use arbihawk_markets::Domain;
pub use arbihawk_store::Store;

pub mod prelude {
    pub use crate::core::{Scheduler, SchedulerConfig, SchedulerDeps, TaskKind, TaskResult};
    pub use crate::markets::Domain;
    pub use crate::store::Store;
}
