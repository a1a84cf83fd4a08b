// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! # Synapse Checks
//!
//! Sanity checks to run against a Synapse database before generating the
//! room lists from it.

use sqlx::{PgConnection, query_scalar};
use thiserror::Error;

/// Tables the room lists are generated from
pub const REQUIRED_TABLES: [&str; 4] = ["rooms", "events", "room_stats_current", "room_stats_state"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("query failed: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// An error found whilst checking the Synapse database, that should block the
/// job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error(
        "The `{table}` table is missing from the database. Is the database connection pointing to a Synapse database?"
    )]
    MissingTable { table: &'static str },
}

/// A potential hazard found whilst checking the Synapse database, that should
/// be reported but doesn't block the job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckWarning {
    #[error(
        "The `room_stats_current` table is empty although the database has rooms. Synapse may still be populating its room statistics, in which case the list of rooms to delete will be incomplete."
    )]
    RoomStatsEmpty,
}

/// Check that the Synapse database has what the jobs need. Returns a list of
/// warnings and errors.
///
/// # Errors
///
/// If there is some database connection error.
#[tracing::instrument(skip_all)]
pub async fn synapse_database_check(
    synapse_connection: &mut PgConnection,
) -> Result<(Vec<CheckWarning>, Vec<CheckError>), Error> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for table in REQUIRED_TABLES {
        let exists: bool = query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(table)
            .fetch_one(&mut *synapse_connection)
            .await?;
        if !exists {
            errors.push(CheckError::MissingTable { table });
        }
    }

    // The remaining checks need the tables
    if !errors.is_empty() {
        return Ok((warnings, errors));
    }

    let has_rooms: bool = query_scalar("SELECT EXISTS (SELECT 1 FROM rooms)")
        .fetch_one(&mut *synapse_connection)
        .await?;
    let has_stats: bool = query_scalar("SELECT EXISTS (SELECT 1 FROM room_stats_current)")
        .fetch_one(&mut *synapse_connection)
        .await?;
    if has_rooms && !has_stats {
        warnings.push(CheckWarning::RoomStatsEmpty);
    }

    Ok((warnings, errors))
}
