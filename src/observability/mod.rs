//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, recent lines kept in LogBuffer)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stderr
//!     → webserver `/logs` page (LogBuffer)
//!     → webserver `/metrics` page (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with fields, not interpolated strings
//! - Metrics are cheap (atomic increments)
//! - The metrics registry is passed explicitly; there is no global recorder

pub mod logging;
pub mod metrics;
pub mod version;

pub use logging::{LogBuffer, LoggingError};
pub use metrics::MetricsRegistry;
pub use version::version_string;
