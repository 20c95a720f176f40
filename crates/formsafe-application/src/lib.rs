//! Application layer for formsafe.
//!
//! Coordinates the domain contracts from `formsafe-core` with the stores from
//! `formsafe-infrastructure`. `PersistenceOrchestrator` is the entry point: one
//! instance per mounted form.

pub mod backends;
pub mod error_channel;
pub mod file_cache;
pub mod orchestrator;
pub mod progress;
pub mod telemetry;

pub use backends::StorageBackends;
pub use error_channel::{ErrorCallback, ErrorChannel};
pub use orchestrator::{PersistenceOrchestrator, RestoreOutcome};
pub use telemetry::init_tracing;
