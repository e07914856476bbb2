//! Startup error taxonomy.
//!
//! Every fallible startup step has its own error type in its subsystem;
//! [`StartupError`] unifies them and [`Aborted`] adds the phase in which the
//! failure happened.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::LifecyclePhase;
use crate::observability::LoggingError;
use crate::security::AuthError;
use crate::state_store::ServiceStartError;
use crate::webserver::WebserverError;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Authentication(#[from] AuthError),
    #[error(transparent)]
    ObservabilityStart(#[from] WebserverError),
    #[error(transparent)]
    ServiceStart(#[from] ServiceStartError),
}

impl StartupError {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartupError::Configuration(_) => "configuration_error",
            StartupError::Logging(_) => "logging_error",
            StartupError::Authentication(_) => "authentication_error",
            StartupError::ObservabilityStart(_) => "observability_start_error",
            StartupError::ServiceStart(_) => "service_start_error",
        }
    }
}

/// A startup sequence that stopped at `phase`.
#[derive(Debug, Error)]
#[error("{} failed: {source}", .phase.step())]
pub struct Aborted {
    /// The phase that could not be reached.
    pub phase: LifecyclePhase,
    #[source]
    pub source: StartupError,
}

impl Aborted {
    pub fn new(phase: LifecyclePhase, source: impl Into<StartupError>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}
