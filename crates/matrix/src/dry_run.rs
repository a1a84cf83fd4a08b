// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use tracing::info;

use crate::{DeleteRoomRequest, PurgeHistoryRequest, RoomAdminConnection, RoomId};

/// A [`RoomAdminConnection`] which only reports what it would do.
///
/// It does not wrap a real connection, so that a dry run never needs
/// credentials and can never reach the homeserver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunConnection;

impl DryRunConnection {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl RoomAdminConnection for DryRunConnection {
    fn backend(&self) -> &'static str {
        "dry-run"
    }

    async fn purge_history(
        &self,
        room_id: &RoomId,
        request: &PurgeHistoryRequest,
    ) -> Result<(), anyhow::Error> {
        info!(
            matrix.room_id = %room_id,
            purge_up_to = %request.purge_up_to,
            delete_local_events = request.delete_local_events,
            "Would purge history older than {} days",
            request.retention_days,
        );
        Ok(())
    }

    async fn delete_room(
        &self,
        room_id: &RoomId,
        request: &DeleteRoomRequest,
    ) -> Result<(), anyhow::Error> {
        info!(
            matrix.room_id = %room_id,
            purge = request.purge,
            block = request.block,
            "Would delete room",
        );
        Ok(())
    }
}
