//! Transport layer for the presence monitoring toolkit.
//!
//! The core crate never talks to a network; this crate provides the seam.
//! [`Transport`] is the interface the rest of the system consumes: a
//! subscribe stream of raw envelopes plus the two point queries. Two
//! implementations ship:
//!
//! - [`NatsTransport`] -- the production transport over a version-pinned
//!   `async-nats` client.
//! - [`LoopbackTransport`] -- an in-process broker for tests and demos,
//!   producing the same wire envelopes without a server.
//!
//! [`SnapshotService`] wraps the point queries and records each success in
//! the history log. [`Registry`] is the explicit handle cache owned by the
//! composition root, replacing ambient global client caches.

pub mod config;
pub mod error;
pub mod loopback;
pub mod nats;
pub mod registry;
pub mod snapshot;
pub mod transport;

pub use config::ClientConfig;
pub use error::ClientError;
pub use loopback::{LoopbackBroker, LoopbackTransport};
pub use nats::NatsTransport;
pub use registry::Registry;
pub use snapshot::SnapshotService;
pub use transport::{EventStream, HereNowResponse, Transport, TransportKey, WhereNowResponse};
