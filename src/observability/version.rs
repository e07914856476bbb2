//! Version reporting.

pub const BINARY_NAME: &str = "statestored";

/// `statestored version 0.1.0 RELEASE`
pub fn version_string() -> String {
    let build = if cfg!(debug_assertions) { "DEBUG" } else { "RELEASE" };
    format!("{} version {} {}", BINARY_NAME, env!("CARGO_PKG_VERSION"), build)
}
