//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (principal configured):
//!     → kerberos.rs (resolve principal, kinit from keytab)
//!     → AuthSession (owns periodic ticket renewal)
//!     → only then may listeners open
//! ```
//!
//! # Design Decisions
//! - Fail closed: an authentication failure aborts startup
//! - No principal means no authentication, silently

pub mod kerberos;

pub use kerberos::{
    export_credential_cache, AuthError, AuthSession, Authenticator, KinitAuthenticator, Principal,
};

/// Service name the daemon authenticates as.
pub const SERVICE_NAME: &str = "StateStore";
