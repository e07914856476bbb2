//! State store: the coordination service run by this daemon.
//!
//! # Data Flow
//! ```text
//! Members / subscribers (HTTP)
//!     → api.rs (register, unregister, subscribe, poll updates)
//!     → membership.rs (live maps, marked dirty on change)
//!
//! Update loop (every update_frequency):
//!     membership.rs publish → new MembershipSnapshot (version + 1)
//!     → visible to subscribers polling `updates?since=`
//!     → metrics (rounds, live members, subscriptions, version)
//! ```
//!
//! # Design Decisions
//! - The startup sequence only sees the `CoordinationService` trait
//! - Changes become visible on the update cadence, never in between
//! - Stops on SIGINT/SIGTERM/SIGQUIT, on its stop handle, or on a server fault

pub mod api;
pub mod membership;
pub mod service;

pub use membership::{Membership, MembershipSnapshot, SubscriberUpdate, Subscription};
pub use service::{
    CoordinationService, ServiceStartError, StateStore, DEFAULT_UPDATE_FREQUENCY,
};
