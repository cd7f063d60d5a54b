//! Point-query façade that records every success in the history log.
//!
//! [`SnapshotService`] owns no state of its own: it borrows a transport
//! handle, performs the query, and appends exactly one
//! [`SnapshotRecord`] to the caller-owned history log per success. It
//! never touches reconciler state -- the caller decides whether and when
//! to feed a result into
//! [`bootstrap`](presence_core::MembershipReconciler::bootstrap), and must
//! check that the subject is still the active one before doing so
//! (in-flight queries cannot be cancelled).

use chrono::Utc;
use tracing::debug;

use presence_core::HistoryLog;
use presence_types::{RecordId, SnapshotRecord, SnapshotSubject};

use crate::error::ClientError;
use crate::transport::{HereNowResponse, Transport, WhereNowResponse};

/// Stateless façade over a transport's point queries.
#[derive(Debug)]
pub struct SnapshotService<'a, T> {
    transport: &'a T,
}

impl<'a, T: Transport> SnapshotService<'a, T> {
    /// Create a service bound to a transport handle.
    pub const fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Query a channel's current occupants, recording the result.
    ///
    /// On transport failure the error is returned and the history log is
    /// left untouched.
    pub async fn here_now(
        &self,
        channel: &str,
        history: &mut HistoryLog,
    ) -> Result<HereNowResponse, ClientError> {
        let response = self.transport.here_now(channel).await?;
        history.append(SnapshotRecord {
            id: RecordId::new(),
            subject: SnapshotSubject::Channel(channel.to_owned()),
            occupancy_or_channels: response.occupancy,
            uuids: response.uuids.clone(),
            captured_at: Utc::now(),
            raw: response.raw.clone(),
        });
        debug!(
            channel = channel,
            occupancy = response.occupancy,
            "recorded here-now snapshot"
        );
        Ok(response)
    }

    /// Query the channels an identity occupies, recording the result.
    ///
    /// An identity on no channels is a successful empty result, recorded
    /// with a channel count of zero.
    pub async fn where_now(
        &self,
        uuid: &str,
        history: &mut HistoryLog,
    ) -> Result<WhereNowResponse, ClientError> {
        let response = self.transport.where_now(uuid).await?;
        let channel_count = u32::try_from(response.channels.len()).unwrap_or(u32::MAX);
        history.append(SnapshotRecord {
            id: RecordId::new(),
            subject: SnapshotSubject::Identity(uuid.to_owned()),
            occupancy_or_channels: channel_count,
            uuids: response.channels.clone(),
            captured_at: Utc::now(),
            raw: response.raw.clone(),
        });
        debug!(
            uuid = uuid,
            channels = channel_count,
            "recorded where-now snapshot"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackBroker;

    #[tokio::test]
    async fn here_now_appends_one_record() {
        let broker = LoopbackBroker::new();
        let alice = broker.handle("alice");
        let _sub = alice.subscribe("room-1").await;

        let monitor = broker.handle("monitor");
        let service = SnapshotService::new(&monitor);
        let mut history = HistoryLog::new();

        let response = service.here_now("room-1", &mut history).await.ok();
        assert_eq!(response.map(|r| r.occupancy), Some(1));
        assert_eq!(history.len(), 1);
        let record = history.iter().next().cloned();
        assert_eq!(
            record.as_ref().map(|r| r.subject.clone()),
            Some(SnapshotSubject::Channel(String::from("room-1")))
        );
        assert_eq!(
            record.map(|r| r.uuids),
            Some(vec![String::from("alice")])
        );
    }

    #[tokio::test]
    async fn where_now_appends_one_record() {
        let broker = LoopbackBroker::new();
        let alice = broker.handle("alice");
        let _a = alice.subscribe("room-1").await;
        let _b = alice.subscribe("room-2").await;

        let service = SnapshotService::new(&alice);
        let mut history = HistoryLog::new();
        let response = service.where_now("alice", &mut history).await.ok();
        assert_eq!(
            response.map(|r| r.channels.len()),
            Some(2)
        );
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.iter().next().map(|r| r.occupancy_or_channels),
            Some(2)
        );
    }

    #[tokio::test]
    async fn empty_where_now_records_zero_channels() {
        let broker = LoopbackBroker::new();
        let monitor = broker.handle("monitor");
        let service = SnapshotService::new(&monitor);
        let mut history = HistoryLog::new();
        let response = service.where_now("nobody", &mut history).await.ok();
        assert_eq!(response.map(|r| r.channels.is_empty()), Some(true));
        assert_eq!(
            history.iter().next().map(|r| r.occupancy_or_channels),
            Some(0)
        );
    }
}
