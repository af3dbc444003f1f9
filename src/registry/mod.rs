//! Connection-session registry
//!
//! This module provides:
//! - Forward index (user -> connections, multi-device)
//! - Reverse index (connection -> user)
//! - `SessionRegistry`, which keeps both indices consistent
//! - Statistics and diagnostic snapshots

mod forward;
mod manager;
mod reverse;
mod stats;
mod types;

pub use forward::{Connections, ForwardIndex};
pub use manager::{BindOutcome, SessionRegistry};
pub use reverse::ReverseIndex;
pub use stats::{ConnectionSummary, RegistrySnapshot, RegistryStats, UserSessions};
pub use types::{ConnectionHandle, Frame};
