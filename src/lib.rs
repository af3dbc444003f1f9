// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Session registry (forward/reverse indices and façade)
pub mod registry;

// Callers of the registry
pub mod delivery;
pub mod tasks;

pub use registry::{BindOutcome, ConnectionHandle, Frame, SessionRegistry};
