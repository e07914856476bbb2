//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolved config → Logging → Authentication → Webserver → Metrics
//!         → State store start → Wait for stop
//!
//! Phases (phase.rs):
//!     Forward-only progress, terminal Stopped / Aborted
//!
//! Shutdown (shutdown.rs):
//!     Trigger → every listener wakes → servers drain and exit
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGQUIT → stop the state store
//! ```
//!
//! # Design Decisions
//! - Ordered startup, no concurrent phases
//! - First failure aborts; already started parts drop in reverse order
//! - A shutdown triggered before anyone listens is still observed

pub mod phase;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use phase::{Lifecycle, LifecyclePhase, PhaseWatch};
pub use shutdown::{Shutdown, ShutdownListener};
pub use startup::Orchestrator;
