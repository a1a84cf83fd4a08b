// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use figment::Figment;
use futures_util::TryStreamExt;
use janitor_config::{ConfigurationSectionExt, DatabaseConfig, RoomDeletionConfig};
use janitor_matrix::DeleteRoomRequest;
use janitor_synapse_reader::{RoomMembership, SynapseReader};
use janitor_tasks::{Dispatcher, EmptyRoomPredicate, ListJob, RoomAction, RoomMembershipRecord};
use tracing::{info, info_span};

use super::{JobOptions, explain_abort, report};
use crate::util::{
    check_synapse_database, database_connection_from_config, room_admin_connection_from_config,
};

#[derive(Parser, Debug)]
pub(super) struct Options {
    #[command(flatten)]
    pub(super) job: JobOptions,

    /// Delete the rooms with at most this many joined members
    #[arg(long, value_name = "MEMBERS")]
    threshold: Option<u64>,
}

impl Options {
    fn apply(&self, mut config: RoomDeletionConfig) -> RoomDeletionConfig {
        if let Some(list) = &self.job.list {
            config.list_path.clone_from(list);
        }

        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }

        config
    }

    pub async fn run(self, figment: &Figment) -> anyhow::Result<ExitCode> {
        let _span = info_span!("cli.delete_rooms").entered();

        let config = RoomDeletionConfig::extract_or_default(figment)
            .map_err(anyhow::Error::from_boxed)
            .context("invalid `room_deletion` configuration")?;
        let config = self.apply(config);

        let mode = self.job.mode();
        let connection = room_admin_connection_from_config(figment, mode).await?;
        let dispatcher = Dispatcher::new(&*connection, mode);

        let job = ListJob {
            list_path: &config.list_path,
            force: self.job.force,
            predicate: EmptyRoomPredicate {
                threshold: config.threshold,
            },
            action: RoomAction::DeleteRoom(request(&config)),
        };

        info!(
            list.path = %config.list_path,
            threshold = config.threshold,
            purge = config.purge,
            block = config.block,
            "Deleting rooms with few members"
        );

        let summary = job
            .run::<RoomMembershipRecord, _, _>(|| fetch_room_memberships(figment), &dispatcher)
            .await
            .map_err(explain_abort)?;

        Ok(report(&summary))
    }
}

fn request(config: &RoomDeletionConfig) -> DeleteRoomRequest {
    DeleteRoomRequest {
        purge: config.purge,
        block: config.block,
        message: config.message.clone(),
    }
}

async fn fetch_room_memberships(figment: &Figment) -> anyhow::Result<Vec<RoomMembership>> {
    let config = DatabaseConfig::extract_or_default(figment)
        .map_err(anyhow::Error::from_boxed)
        .context("invalid `database` configuration")?;

    let mut conn = database_connection_from_config(&config).await?;
    check_synapse_database(&mut conn).await?;

    let mut reader = SynapseReader::new(&mut conn).await?;
    let rows: Vec<RoomMembership> = reader.read_room_memberships().try_collect().await?;
    reader.finish().await?;

    info!(rooms = rows.len(), "Read the membership of every room");
    Ok(rows)
}
