// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod admin_command;
mod database;
mod matrix;
mod purge;
mod room_deletion;

pub use self::{
    admin_command::AdminCommandConfig,
    database::{DatabaseConfig, PgSslMode},
    matrix::{AdminBackend, MatrixConfig},
    purge::PurgeConfig,
    room_deletion::RoomDeletionConfig,
};
use crate::util::{ConfigError, ConfigurationSection};

/// Application configuration root
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Connection to the Synapse database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Configuration related to the homeserver
    #[serde(default)]
    pub matrix: MatrixConfig,

    /// External administration command
    #[serde(default)]
    pub admin_command: AdminCommandConfig,

    /// History purge job
    #[serde(default)]
    pub purge: PurgeConfig,

    /// Empty room deletion job
    #[serde(default)]
    pub room_deletion: RoomDeletionConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        self.database.validate(figment)?;
        self.matrix.validate(figment)?;
        self.admin_command.validate(figment)?;
        self.purge.validate(figment)?;
        self.room_deletion.validate(figment)?;

        Ok(())
    }
}
