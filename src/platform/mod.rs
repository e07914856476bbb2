//! Host platform discovery.
//!
//! # Responsibilities
//! - Look up the system hostname used as the default `hostname`
//! - Discover CPU information once at startup (`cpu_info.rs`)

pub mod cpu_info;

pub use cpu_info::CpuInfo;

/// The system hostname, or `None` when the lookup fails.
pub fn system_hostname() -> Option<String> {
    match hostname::get() {
        Ok(name) => Some(name.to_string_lossy().into_owned()).filter(|h| !h.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to look up system hostname");
            None
        }
    }
}
