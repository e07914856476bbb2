//! State store daemon library.
//!
//! The binary resolves configuration, installs logging, then hands over to
//! [`lifecycle::Orchestrator`], which brings up authentication, the
//! diagnostic webserver, metrics and the state store in that order.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod platform;
pub mod security;
pub mod state_store;
pub mod webserver;

pub use config::ProcessConfig;
pub use error::{Aborted, StartupError};
pub use lifecycle::{LifecyclePhase, Orchestrator, Shutdown};
