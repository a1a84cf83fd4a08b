// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

mod dry_run;
mod mock;
mod room_id;

use chrono::{DateTime, Utc};

pub use self::{
    dry_run::DryRunConnection,
    mock::{MockRoomAdminConnection, RecordedCall},
    room_id::{RoomId, RoomIdError},
};

/// Parameters of a history purge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeHistoryRequest {
    /// Events older than this timestamp are purged
    pub purge_up_to: DateTime<Utc>,

    /// The retention window the timestamp was computed from, in days.
    ///
    /// Some backends only accept a number of days.
    pub retention_days: u32,

    /// Whether events sent by local users should be purged as well
    pub delete_local_events: bool,
}

impl PurgeHistoryRequest {
    /// Create a request purging everything older than `retention_days` days
    /// before `now`
    #[must_use]
    pub fn older_than_days(now: DateTime<Utc>, retention_days: u32) -> Self {
        Self {
            purge_up_to: now - chrono::Duration::days(retention_days.into()),
            retention_days,
            delete_local_events: false,
        }
    }

    #[must_use]
    pub fn with_delete_local_events(mut self, delete_local_events: bool) -> Self {
        self.delete_local_events = delete_local_events;
        self
    }
}

/// Parameters of a room deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRoomRequest {
    /// Whether to remove all traces of the room from the database
    pub purge: bool,

    /// Whether to prevent future attempts to join the room
    pub block: bool,

    /// Message sent to the local users kicked out of the room
    pub message: Option<String>,
}

impl Default for DeleteRoomRequest {
    fn default() -> Self {
        Self {
            purge: true,
            block: false,
            message: None,
        }
    }
}

/// An administrative connection able to mutate rooms on the homeserver
#[async_trait::async_trait]
pub trait RoomAdminConnection: Send + Sync {
    /// A short, human-readable name for the backend, used in logs
    fn backend(&self) -> &'static str;

    /// Purge the history of a room, keeping the room itself.
    ///
    /// # Parameters
    ///
    /// * `room_id` - The room to purge.
    /// * `request` - What to purge.
    ///
    /// # Errors
    ///
    /// Returns an error if the homeserver is unreachable or the purge failed.
    async fn purge_history(
        &self,
        room_id: &RoomId,
        request: &PurgeHistoryRequest,
    ) -> Result<(), anyhow::Error>;

    /// Delete a room, kicking out all its local members.
    ///
    /// # Parameters
    ///
    /// * `room_id` - The room to delete.
    /// * `request` - How to delete it.
    ///
    /// # Errors
    ///
    /// Returns an error if the homeserver is unreachable or the deletion
    /// failed.
    async fn delete_room(
        &self,
        room_id: &RoomId,
        request: &DeleteRoomRequest,
    ) -> Result<(), anyhow::Error>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_purge_request_from_retention() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        let request = PurgeHistoryRequest::older_than_days(now, 30);
        assert_eq!(
            request.purge_up_to,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(request.retention_days, 30);
        assert!(!request.delete_local_events);

        let request = request.with_delete_local_events(true);
        assert!(request.delete_local_events);
    }
}
