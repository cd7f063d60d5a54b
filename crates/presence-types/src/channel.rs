//! The presence-channel naming convention.
//!
//! Every base channel has an implicit companion channel that carries its
//! join/leave/state-change/occupancy notifications. The companion is named
//! by appending a reserved suffix to the base channel name. The suffix is a
//! fixed wire-level constant of the platform, not configurable here.

/// Reserved suffix marking a channel as a presence-announcement channel.
pub const PRESENCE_SUFFIX: &str = "-pnpres";

/// Return whether `channel` names a presence-announcement channel.
///
/// A bare suffix with no base channel in front of it does not count.
pub fn is_presence_channel(channel: &str) -> bool {
    channel.len() > PRESENCE_SUFFIX.len() && channel.ends_with(PRESENCE_SUFFIX)
}

/// Strip the presence suffix, returning the base channel name.
///
/// Returns `None` if `channel` is not a presence channel.
pub fn base_channel_of(channel: &str) -> Option<&str> {
    if is_presence_channel(channel) {
        channel.strip_suffix(PRESENCE_SUFFIX)
    } else {
        None
    }
}

/// Return the presence-announcement channel name for a base channel.
pub fn presence_channel_for(base: &str) -> String {
    format!("{base}{PRESENCE_SUFFIX}")
}
