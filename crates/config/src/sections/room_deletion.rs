// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::ConfigurationSection;

fn default_list_path() -> Utf8PathBuf {
    "rooms_to_delete.txt".into()
}

fn default_threshold() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

/// Configuration of the empty room deletion job
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RoomDeletionConfig {
    /// Where the list of rooms and their member count is kept between runs
    #[serde(default = "default_list_path")]
    #[schemars(with = "String")]
    pub list_path: Utf8PathBuf,

    /// Rooms with this many joined members or fewer are deleted
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Whether to remove every trace of the room from the database
    #[serde(default = "default_true")]
    pub purge: bool,

    /// Whether to prevent anyone from joining the room again
    #[serde(default)]
    pub block: bool,

    /// Message shown to the local members kicked out of the room
    pub message: Option<String>,
}

impl Default for RoomDeletionConfig {
    fn default() -> Self {
        Self {
            list_path: default_list_path(),
            threshold: default_threshold(),
            purge: true,
            block: false,
            message: None,
        }
    }
}

impl ConfigurationSection for RoomDeletionConfig {
    const PATH: Option<&'static str> = Some("room_deletion");
}
