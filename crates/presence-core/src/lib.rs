//! The algorithmic core of the presence monitoring toolkit.
//!
//! Three pieces, each independent of any transport:
//!
//! - [`normalize`] -- converts arbitrary wire envelopes into canonical
//!   [`presence_types::PresenceEvent`] values, filtering out everything
//!   that is not a presence event.
//! - [`reconcile`] -- folds normalized events and authoritative snapshots
//!   into a consistent per-channel membership view.
//! - [`history`] -- a bounded, most-recent-first log of snapshot records.
//!
//! Nothing in this crate performs I/O or panics; normalization failure is
//! `None`, and the reconciler is total over all event shapes.

pub mod history;
pub mod normalize;
pub mod reconcile;

pub use history::{HistoryError, HistoryLog};
pub use normalize::normalize;
pub use reconcile::MembershipReconciler;
