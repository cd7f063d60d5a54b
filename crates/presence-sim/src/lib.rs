//! Simulated client identities for exercising the presence pipeline.
//!
//! The pool creates and destroys ephemeral identities whose transport
//! subscriptions generate real join/leave traffic. A reconciler watching
//! the same channels observes that traffic through the normal stream; the
//! pool itself never calls the reconciler. Test and demo aid, never
//! authoritative.

pub mod error;
pub mod pool;

pub use error::SimError;
pub use pool::{HandleFactory, SimulatedClientPool, SimulatedIdentity};
