//! `switchboard-core` — shared identifiers, roles, configuration and errors.
//!
//! Everything here is consumed by at least two other workspace crates;
//! subsystem-specific types live with their subsystem.

pub mod config;
pub mod error;
pub mod types;

pub use config::SwitchboardConfig;
pub use error::{Result, SwitchboardError};
pub use types::UserRole;
