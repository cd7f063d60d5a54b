//! Membership reconciliation: folding events and snapshots into one view.
//!
//! One [`MembershipReconciler`] owns the membership state of every channel
//! observed during a monitoring session. It is plain owned data with no
//! interior locking: live events are delivered through one sequential
//! callback per subscription, so all mutation happens from a single task.
//!
//! # Reconciliation rules
//!
//! - An event's occupancy is applied **before** its member deltas, so that
//!   an authoritative occupancy of zero can reset the channel even when the
//!   same event carries joins.
//! - Member maintenance is pure set arithmetic, which makes `apply`
//!   idempotent: the same event applied twice yields the same set.
//! - No ordering is derived from timetokens. The most recently applied
//!   occupancy value is authoritative, whatever its arrival order. This is
//!   a deliberate, documented limitation; see the bootstrap-race note on
//!   [`MembershipReconciler::bootstrap`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, info};

use presence_types::{ChannelMembership, PresenceAction, PresenceEvent};

/// Owns the per-channel membership view for one monitoring session.
#[derive(Debug, Default)]
pub struct MembershipReconciler {
    channels: HashMap<String, ChannelMembership>,
}

impl MembershipReconciler {
    /// Create a reconciler with no channels tracked.
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Fold one normalized event into the channel it describes.
    ///
    /// Order of operations: occupancy first, then adds (`join` array plus
    /// the event identity on Join/StateChange), then removes (`leave` and
    /// `timeout` arrays plus the event identity on Leave/Timeout), then
    /// the authoritative-reset rule: an occupancy of exactly zero clears
    /// the member set entirely, discarding adds performed for this same
    /// event.
    pub fn apply(&mut self, event: &PresenceEvent) {
        let membership = self
            .channels
            .entry(event.base_channel.clone())
            .or_default();

        if let Some(occupancy) = event.occupancy {
            membership.occupancy = occupancy;
        }

        for uuid in &event.join {
            membership.members.insert(uuid.clone());
        }
        if let Some(uuid) = &event.uuid
            && matches!(
                event.action,
                Some(PresenceAction::Join | PresenceAction::StateChange)
            )
        {
            membership.members.insert(uuid.clone());
        }

        for uuid in event.leave.iter().chain(&event.timeout) {
            membership.members.remove(uuid);
        }
        if let Some(uuid) = &event.uuid
            && matches!(
                event.action,
                Some(PresenceAction::Leave | PresenceAction::Timeout)
            )
        {
            membership.members.remove(uuid);
        }

        // Authoritative reset: a zero occupancy empties the channel even
        // if this same event announced joins.
        if event.occupancy == Some(0) {
            membership.members.clear();
        }

        debug!(
            channel = %event.base_channel,
            action = ?event.action,
            members = membership.members.len(),
            occupancy = membership.occupancy,
            "applied presence event"
        );
    }

    /// Replace a channel's membership wholesale from a snapshot.
    ///
    /// Intended to seed a channel before its live stream is attached. A
    /// bootstrap racing with live events is not merged: whichever write
    /// lands last wins, and events overwritten by a late-resolving
    /// bootstrap are silently lost. No timetoken-based tiebreak is
    /// applied.
    pub fn bootstrap<I, S>(&mut self, channel: &str, uuids: I, occupancy: u32)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let membership = ChannelMembership {
            members: uuids.into_iter().map(Into::into).collect(),
            occupancy,
        };
        info!(
            channel = channel,
            members = membership.members.len(),
            occupancy,
            "bootstrapped channel membership"
        );
        self.channels.insert(channel.to_owned(), membership);
    }

    /// The membership view for a channel, if it is tracked.
    pub fn membership(&self, channel: &str) -> Option<&ChannelMembership> {
        self.channels.get(channel)
    }

    /// The identities currently believed present on a channel, sorted.
    pub fn members(&self, channel: &str) -> Vec<String> {
        self.channels
            .get(channel)
            .map(|m| m.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent authoritative occupancy for a channel.
    pub fn occupancy(&self, channel: &str) -> u32 {
        self.channels.get(channel).map_or(0, |m| m.occupancy)
    }

    /// All channels with tracked state, in arbitrary order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Drop a channel's state entirely (the operator stopped watching it).
    ///
    /// Returns whether the channel was tracked.
    pub fn forget(&mut self, channel: &str) -> bool {
        match self.channels.entry(channel.to_owned()) {
            Entry::Occupied(entry) => {
                entry.remove();
                true
            }
            Entry::Vacant(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_types::PresenceEvent;

    fn event(base: &str) -> PresenceEvent {
        PresenceEvent::bare(format!("{base}-pnpres"), base)
    }

    fn join_event(base: &str, uuid: &str) -> PresenceEvent {
        let mut e = event(base);
        e.action = Some(PresenceAction::Join);
        e.uuid = Some(uuid.to_owned());
        e
    }

    #[test]
    fn join_adds_member() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "alice"));
        assert_eq!(reconciler.members("room-1"), vec!["alice"]);
    }

    #[test]
    fn apply_is_idempotent() {
        let mut reconciler = MembershipReconciler::new();
        let e = join_event("room-1", "alice");
        reconciler.apply(&e);
        let once = reconciler.members("room-1");
        reconciler.apply(&e);
        assert_eq!(reconciler.members("room-1"), once);
    }

    #[test]
    fn leave_removes_member() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "alice"));
        let mut leave = event("room-1");
        leave.action = Some(PresenceAction::Leave);
        leave.uuid = Some(String::from("alice"));
        reconciler.apply(&leave);
        assert!(reconciler.members("room-1").is_empty());
    }

    #[test]
    fn timeout_removes_member() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "bob"));
        let mut timeout = event("room-1");
        timeout.action = Some(PresenceAction::Timeout);
        timeout.uuid = Some(String::from("bob"));
        reconciler.apply(&timeout);
        assert!(reconciler.members("room-1").is_empty());
    }

    #[test]
    fn state_change_counts_as_presence() {
        let mut reconciler = MembershipReconciler::new();
        let mut e = event("room-1");
        e.action = Some(PresenceAction::StateChange);
        e.uuid = Some(String::from("carol"));
        reconciler.apply(&e);
        assert_eq!(reconciler.members("room-1"), vec!["carol"]);
    }

    #[test]
    fn zero_occupancy_resets_even_with_joins() {
        let mut reconciler = MembershipReconciler::new();
        let mut e = event("room-1");
        e.occupancy = Some(0);
        e.join = vec![String::from("a"), String::from("b")];
        reconciler.apply(&e);
        assert!(reconciler.members("room-1").is_empty());
        assert_eq!(reconciler.occupancy("room-1"), 0);
    }

    #[test]
    fn batch_merge() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.bootstrap("room-1", vec!["c", "d"], 2);
        let mut e = event("room-1");
        e.action = Some(PresenceAction::Interval);
        e.join = vec![String::from("a"), String::from("b")];
        e.leave = vec![String::from("c")];
        reconciler.apply(&e);
        assert_eq!(reconciler.members("room-1"), vec!["a", "b", "d"]);
    }

    #[test]
    fn bootstrap_then_diff() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.bootstrap("room-1", vec!["x", "y"], 2);
        let mut leave = event("room-1");
        leave.action = Some(PresenceAction::Leave);
        leave.uuid = Some(String::from("x"));
        reconciler.apply(&leave);
        assert_eq!(reconciler.members("room-1"), vec!["y"]);
    }

    #[test]
    fn bootstrap_replaces_wholesale() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "old"));
        reconciler.bootstrap("room-1", vec!["new"], 1);
        assert_eq!(reconciler.members("room-1"), vec!["new"]);
        assert_eq!(reconciler.occupancy("room-1"), 1);
    }

    #[test]
    fn occupancy_without_delta_diverges_transiently() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "alice"));
        let mut e = event("room-1");
        e.occupancy = Some(5);
        reconciler.apply(&e);
        // Occupancy is authoritative; members unchanged until the next
        // reset or bootstrap.
        assert_eq!(reconciler.occupancy("room-1"), 5);
        assert_eq!(reconciler.members("room-1"), vec!["alice"]);
    }

    #[test]
    fn channels_are_independent() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "alice"));
        reconciler.apply(&join_event("room-2", "bob"));
        assert_eq!(reconciler.members("room-1"), vec!["alice"]);
        assert_eq!(reconciler.members("room-2"), vec!["bob"]);
        assert_eq!(reconciler.channels().count(), 2);
    }

    #[test]
    fn forget_drops_channel_state() {
        let mut reconciler = MembershipReconciler::new();
        reconciler.apply(&join_event("room-1", "alice"));
        assert!(reconciler.forget("room-1"));
        assert!(!reconciler.forget("room-1"));
        assert!(reconciler.membership("room-1").is_none());
    }

    #[test]
    fn untracked_channel_reads_as_empty() {
        let reconciler = MembershipReconciler::new();
        assert!(reconciler.members("nowhere").is_empty());
        assert_eq!(reconciler.occupancy("nowhere"), 0);
    }
}
