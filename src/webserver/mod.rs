//! Diagnostic webserver subsystem.
//!
//! # Data Flow
//! ```text
//! Any subsystem
//!     → handler.rs (PathHandlerRegistry::register_path_handler)
//!     → server.rs (DashMap of path → handler)
//!
//! HTTP request
//!     → server.rs fallback dispatch (lookup at request time)
//!     → handler renders Page (text or JSON)
//! ```
//!
//! # Design Decisions
//! - Handlers can be added before or after the listener starts
//! - Default pages (status, varz, logs) live in pages.rs
//! - The listener stops when the Webserver is dropped

pub mod handler;
pub mod pages;
pub mod server;

pub use handler::{Page, PageArgs, PathHandler, PathHandlerRegistry};
pub use pages::DefaultPages;
pub use server::{DiagnosticServer, Webserver, WebserverError};
