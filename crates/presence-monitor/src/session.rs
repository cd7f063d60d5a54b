//! Monitor session state: one reconciler, one history log, one active
//! channel.
//!
//! All mutation happens from the single monitor task, so the session is
//! plain owned data. The session carries a generation counter as the
//! stale-result guard: in-flight point queries cannot be cancelled, so a
//! bootstrap result is applied only if the channel it pertains to is still
//! the active one under the same generation. A result that arrives after
//! the operator switched channels is dropped with a warning.
//!
//! Live events racing an in-flight bootstrap are deliberately not
//! reconciled: whichever write resolves last persists, and events
//! overwritten by a late bootstrap are silently lost. No timetoken
//! tiebreak is applied; the most recently applied write is authoritative.

use tracing::warn;

use presence_core::{HistoryLog, MembershipReconciler, normalize};
use serde_json::Value;

/// Token returned by [`MonitorSession::watch`], proving which watch
/// generation a bootstrap was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchToken {
    generation: u64,
}

/// Owned state for one monitoring session.
#[derive(Debug)]
pub struct MonitorSession {
    reconciler: MembershipReconciler,
    history: HistoryLog,
    active_channel: Option<String>,
    generation: u64,
}

impl MonitorSession {
    /// Create a session with nothing watched.
    pub fn new() -> Self {
        Self {
            reconciler: MembershipReconciler::new(),
            history: HistoryLog::new(),
            active_channel: None,
            generation: 0,
        }
    }

    /// Make `channel` the active channel and return the token that guards
    /// bootstraps issued for it.
    pub fn watch(&mut self, channel: &str) -> WatchToken {
        self.generation = self.generation.wrapping_add(1);
        self.active_channel = Some(channel.to_owned());
        WatchToken {
            generation: self.generation,
        }
    }

    /// The currently active channel, if any.
    pub fn active_channel(&self) -> Option<&str> {
        self.active_channel.as_deref()
    }

    /// Apply a bootstrap result, unless it is stale.
    ///
    /// Returns whether the result was applied. A result issued under an
    /// older token, or for a channel that is no longer active, is dropped.
    pub fn apply_bootstrap(
        &mut self,
        token: WatchToken,
        channel: &str,
        uuids: Vec<String>,
        occupancy: u32,
    ) -> bool {
        let current = token.generation == self.generation
            && self.active_channel.as_deref() == Some(channel);
        if !current {
            warn!(
                channel = channel,
                "dropping stale bootstrap result for inactive channel"
            );
            return false;
        }
        self.reconciler.bootstrap(channel, uuids, occupancy);
        true
    }

    /// Normalize one raw envelope and fold it into the reconciler.
    ///
    /// Non-presence envelopes are silently filtered. Returns whether an
    /// event was applied.
    pub fn apply_envelope(&mut self, envelope: &Value) -> bool {
        match normalize(envelope) {
            Some(event) => {
                self.reconciler.apply(&event);
                true
            }
            None => false,
        }
    }

    /// The reconciler's current view.
    pub const fn reconciler(&self) -> &MembershipReconciler {
        &self.reconciler
    }

    /// The session's history log, for the snapshot service to append to.
    pub const fn history_mut(&mut self) -> &mut HistoryLog {
        &mut self.history
    }

    /// Export the history log for the operator.
    pub fn export_history(&self) -> Result<String, presence_core::HistoryError> {
        self.history.export_all()
    }
}

impl Default for MonitorSession {
    fn default() -> Self {
        Self::new()
    }
}
