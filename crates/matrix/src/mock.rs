// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::collections::HashSet;

use anyhow::bail;
use tokio::sync::RwLock;

use crate::{DeleteRoomRequest, PurgeHistoryRequest, RoomAdminConnection, RoomId};

/// A call made to the [`MockRoomAdminConnection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    PurgeHistory(RoomId, PurgeHistoryRequest),
    DeleteRoom(RoomId, DeleteRoomRequest),
}

impl RecordedCall {
    #[must_use]
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::PurgeHistory(room_id, _) | Self::DeleteRoom(room_id, _) => room_id,
        }
    }
}

/// An in-memory [`RoomAdminConnection`], recording every call made to it
#[derive(Default)]
pub struct MockRoomAdminConnection {
    calls: RwLock<Vec<RecordedCall>>,
    failing_rooms: RwLock<HashSet<RoomId>>,
}

impl MockRoomAdminConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every action on the given room fail
    pub async fn fail_on(&self, room_id: RoomId) {
        self.failing_rooms.write().await.insert(room_id);
    }

    /// Get the calls made so far, in order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: RecordedCall) -> Result<(), anyhow::Error> {
        let room_id = call.room_id().clone();
        self.calls.write().await.push(call);

        if self.failing_rooms.read().await.contains(&room_id) {
            bail!("Simulated failure for room {room_id}");
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl RoomAdminConnection for MockRoomAdminConnection {
    fn backend(&self) -> &'static str {
        "mock"
    }

    async fn purge_history(
        &self,
        room_id: &RoomId,
        request: &PurgeHistoryRequest,
    ) -> Result<(), anyhow::Error> {
        self.record(RecordedCall::PurgeHistory(room_id.clone(), request.clone()))
            .await
    }

    async fn delete_room(
        &self,
        room_id: &RoomId,
        request: &DeleteRoomRequest,
    ) -> Result<(), anyhow::Error> {
        self.record(RecordedCall::DeleteRoom(room_id.clone(), request.clone()))
            .await
    }
}
