// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! # Synapse Database Reader
//!
//! This crate provides read-only access to the room statistics kept by
//! Synapse, used to decide which rooms need maintenance.

use futures_util::{Stream, TryStreamExt};
use sqlx::{Acquire, FromRow, PgConnection, Postgres, Transaction, query};
use thiserror::Error;
use thiserror_ext::ContextInto;

pub mod checks;

#[derive(Debug, Error, ContextInto)]
pub enum Error {
    #[error("database error whilst {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },
}

/// Number of events stored for a room
#[derive(Clone, Debug, FromRow, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoomEventCount {
    pub room_id: String,
    pub event_count: i64,
}

/// Membership statistics of a room, from `room_stats_current`
#[derive(Clone, Debug, FromRow, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoomMembership {
    pub room_id: String,
    /// The `m.room.name` of the room, if any
    pub name: Option<String>,
    pub joined_members: i64,
    pub local_users_in_room: i64,
}

pub struct SynapseReader<'c> {
    txn: Transaction<'c, Postgres>,
}

impl<'conn> SynapseReader<'conn> {
    /// Create a new Synapse reader, which opens a read-only transaction.
    ///
    /// The transaction is deferrable, so that it doesn't block Synapse nor
    /// get cancelled because of concurrent writes.
    ///
    /// # Errors
    ///
    /// Returns an error on any underlying database error
    pub async fn new(synapse_connection: &'conn mut PgConnection) -> Result<Self, Error> {
        let mut txn = synapse_connection
            .begin()
            .await
            .into_database("begin transaction")?;

        query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE READ ONLY DEFERRABLE;")
            .execute(&mut *txn)
            .await
            .into_database("set transaction")?;

        Ok(Self { txn })
    }

    /// Finishes the Synapse reader, ending the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error on any underlying database error whilst committing
    /// the transaction.
    pub async fn finish(self) -> Result<(), Error> {
        self.txn.commit().await.into_database("end transaction")?;
        Ok(())
    }

    /// Estimates the number of rows in the `events` table.
    ///
    /// Counting the events properly on a large homeserver takes minutes, this
    /// is only used to give an idea of the work ahead.
    ///
    /// # Errors
    ///
    /// Returns an error on any underlying database error
    pub async fn estimate_event_count(&mut self) -> Result<u64, Error> {
        let estimate = sqlx::query_scalar::<_, i64>(
            "
            SELECT reltuples::bigint AS estimate FROM pg_class WHERE oid = 'events'::regclass;
            ",
        )
        .fetch_one(&mut *self.txn)
        .await
        .into_database("estimating count of events")?;

        Ok(estimate.max(0).try_into().unwrap_or_default())
    }

    /// Reads the number of events of every room, busiest rooms first.
    pub fn read_room_event_counts(
        &mut self,
    ) -> impl Stream<Item = Result<RoomEventCount, Error>> + '_ {
        sqlx::query_as(
            "
            SELECT
              room_id, COUNT(*) AS event_count
            FROM events
            GROUP BY room_id
            ORDER BY event_count DESC, room_id ASC
            ",
        )
        .fetch(&mut *self.txn)
        .map_err(|err| err.into_database("reading room event counts"))
    }

    /// Reads the membership statistics of every room, emptiest rooms first.
    ///
    /// Rooms are not filtered here: the threshold is applied when the list is
    /// used, so that changing it doesn't require querying again.
    pub fn read_room_memberships(
        &mut self,
    ) -> impl Stream<Item = Result<RoomMembership, Error>> + '_ {
        sqlx::query_as(
            "
            SELECT
              rsc.room_id,
              rss.name,
              rsc.joined_members::bigint AS joined_members,
              rsc.local_users_in_room::bigint AS local_users_in_room
            FROM room_stats_current rsc
            LEFT JOIN room_stats_state rss USING (room_id)
            ORDER BY rsc.joined_members ASC, rsc.room_id ASC
            ",
        )
        .fetch(&mut *self.txn)
        .map_err(|err| err.into_database("reading room membership statistics"))
    }
}
