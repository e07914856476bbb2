//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde and clap handle syntactic checks)
//! - Detect conflicting listener ports
//! - Check that authentication settings are complete
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProcessConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is handed to any subsystem

use thiserror::Error;

use crate::config::schema::ProcessConfig;

/// Longest accepted Kerberos re-init interval: one week.
pub const MAX_REINIT_INTERVAL_MINS: u64 = 7 * 24 * 60;

/// A single semantic problem with the resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The webserver and the state store would bind the same port.
    #[error("state_store_port and webserver_port are both {0}")]
    PortConflict(u16),
    /// A principal was given but no keytab to obtain tickets with.
    #[error("principal is set but keytab_file is empty")]
    MissingKeytab,
    /// Kerberos is enabled with a zero re-init interval.
    #[error("kerberos_reinit_interval_mins must be greater than 0")]
    ZeroReinitInterval,
    #[error(
        "kerberos_reinit_interval_mins is {0}, the maximum is {max}",
        max = MAX_REINIT_INTERVAL_MINS
    )]
    ExcessiveReinitInterval(u64),
    /// The in-memory log buffer would hold nothing.
    #[error("log_buffer_lines must be greater than 0")]
    EmptyLogBuffer,
    /// The webserver interface is blank while the webserver is enabled.
    #[error("webserver_interface must not be empty")]
    EmptyWebserverInterface,
}

/// Check a resolved configuration, collecting every problem found.
pub fn validate_config(config: &ProcessConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.enable_webserver {
        // Port 0 asks the OS for an ephemeral port, which never collides.
        if config.webserver_port != 0 && config.webserver_port == config.state_store_port {
            errors.push(ValidationError::PortConflict(config.webserver_port));
        }
        if config.webserver_interface.trim().is_empty() {
            errors.push(ValidationError::EmptyWebserverInterface);
        }
    }

    if config.kerberos_enabled() {
        if config.keytab_file.is_empty() {
            errors.push(ValidationError::MissingKeytab);
        }
        match config.kerberos_reinit_interval_mins {
            0 => errors.push(ValidationError::ZeroReinitInterval),
            mins if mins > MAX_REINIT_INTERVAL_MINS => {
                errors.push(ValidationError::ExcessiveReinitInterval(mins))
            }
            _ => {}
        }
    }

    if config.log_buffer_lines == 0 {
        errors.push(ValidationError::EmptyLogBuffer);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
