// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use anyhow::Context as _;
use async_trait::async_trait;
use janitor_matrix::{
    DeleteRoomRequest, DryRunConnection, PurgeHistoryRequest, RoomAdminConnection, RoomId,
};
use tracing::{error, info};

/// How the dispatcher acts on the selected rooms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Act on every room
    #[default]
    Auto,

    /// Only report what would be done
    DryRun,

    /// Ask before acting on each room
    Manual,
}

/// The action applied to each selected room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    PurgeHistory(PurgeHistoryRequest),
    DeleteRoom(DeleteRoomRequest),
}

impl RoomAction {
    /// Describes the action, for prompts and logs
    #[must_use]
    pub fn describe(&self, room_id: &RoomId) -> String {
        match self {
            Self::PurgeHistory(request) => format!(
                "Purge the history of {room_id} older than {} days?",
                request.retention_days
            ),
            Self::DeleteRoom(_) => format!("Delete the room {room_id}?"),
        }
    }

    async fn apply(
        &self,
        connection: &dyn RoomAdminConnection,
        room_id: &RoomId,
    ) -> Result<(), anyhow::Error> {
        match self {
            Self::PurgeHistory(request) => connection.purge_history(room_id, request).await,
            Self::DeleteRoom(request) => connection.delete_room(room_id, request).await,
        }
    }
}

/// Asks the operator whether to act on a room
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the operator could not be asked
    async fn confirm(&self, room_id: &RoomId, action: &RoomAction) -> Result<bool, anyhow::Error>;
}

/// Asks on the terminal, defaulting to no
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmation;

#[async_trait]
impl Confirmation for TerminalConfirmation {
    async fn confirm(&self, room_id: &RoomId, action: &RoomAction) -> Result<bool, anyhow::Error> {
        let prompt = action.describe(room_id);
        tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await?
        .context("Could not read the answer from the terminal")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Dispatcher<'a> {
    connection: &'a dyn RoomAdminConnection,
    mode: DispatchMode,
    confirmation: &'a dyn Confirmation,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher acting through `connection`.
    ///
    /// In [`DispatchMode::DryRun`], `connection` is never used.
    #[must_use]
    pub fn new(connection: &'a dyn RoomAdminConnection, mode: DispatchMode) -> Self {
        Self {
            connection,
            mode,
            confirmation: &TerminalConfirmation,
        }
    }

    /// Ask for confirmations with something else than the terminal
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: &'a dyn Confirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Apply `action` on each room, one after the other.
    ///
    /// A failed action is logged and counted, and doesn't stop the other
    /// rooms from being processed.
    ///
    /// # Errors
    ///
    /// Returns an error if in manual mode and the operator could not be
    /// asked.
    pub async fn dispatch(
        &self,
        rooms: impl IntoIterator<Item = &RoomId>,
        action: &RoomAction,
    ) -> Result<DispatchSummary, anyhow::Error> {
        let dry_run = DryRunConnection::new();
        let connection: &dyn RoomAdminConnection = match self.mode {
            DispatchMode::DryRun => &dry_run,
            DispatchMode::Auto | DispatchMode::Manual => self.connection,
        };

        let mut summary = DispatchSummary::default();
        for room_id in rooms {
            if self.mode == DispatchMode::Manual
                && !self.confirmation.confirm(room_id, action).await?
            {
                info!(matrix.room_id = %room_id, "Skipped by the operator");
                summary.skipped += 1;
                continue;
            }

            match action.apply(connection, room_id).await {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    error!(
                        matrix.room_id = %room_id,
                        backend = connection.backend(),
                        error = &*err as &dyn std::error::Error,
                        "Action failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
