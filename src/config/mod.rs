//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap)      config file (TOML)
//!     → flags.rs               → loader.rs (parse & deserialize)
//!            \                   /
//!             loader::resolve: defaults → system hostname → file → flags
//!     → validation.rs (semantic checks)
//!     → ProcessConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is resolved once at startup and never mutated afterwards
//! - All fields have defaults to allow running without any flags
//! - Validation separates syntactic (serde, clap) from semantic checks

pub mod flags;
pub mod loader;
pub mod schema;
pub mod validation;

pub use flags::{Command, Flags};
pub use loader::{load_config, ConfigError};
pub use schema::{ConfigOverrides, ProcessConfig};
