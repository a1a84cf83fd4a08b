// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigurationSection};

fn default_list_path() -> Utf8PathBuf {
    "rooms_to_purge.txt".into()
}

fn default_retention_days() -> u32 {
    30
}

fn default_exclusions() -> Vec<String> {
    vec!["fdn.fr".to_owned()]
}

/// Configuration of the history purge job
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PurgeConfig {
    /// Where the list of rooms and their event count is kept between runs
    #[serde(default = "default_list_path")]
    #[schemars(with = "String")]
    pub list_path: Utf8PathBuf,

    /// Events older than this number of days are purged
    #[serde(default = "default_retention_days")]
    #[schemars(range(min = 1))]
    pub retention_days: u32,

    /// Rooms whose ID contains any of these strings are never purged
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,

    /// Rooms with fewer events than this are left alone
    #[serde(default)]
    pub min_events: u64,

    /// Whether to also purge events sent by local users
    #[serde(default)]
    pub delete_local_events: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            list_path: default_list_path(),
            retention_days: default_retention_days(),
            exclusions: default_exclusions(),
            min_events: 0,
            delete_local_events: false,
        }
    }
}

impl ConfigurationSection for PurgeConfig {
    const PATH: Option<&'static str> = Some("purge");

    fn validate(&self, _figment: &figment::Figment) -> Result<(), ConfigError> {
        if self.retention_days == 0 {
            return Err("`purge.retention_days` must be at least 1".into());
        }

        if self.exclusions.iter().any(String::is_empty) {
            return Err("`purge.exclusions` must not contain empty strings, they would exclude every room".into());
        }

        Ok(())
    }
}
