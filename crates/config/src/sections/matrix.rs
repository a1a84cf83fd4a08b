// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use camino::Utf8PathBuf;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as, skip_serializing_none};
use url::Url;

use crate::{ConfigError, ConfigurationSection};

fn default_homeserver() -> String {
    "localhost:8008".to_owned()
}

fn default_endpoint() -> Url {
    Url::parse("http://localhost:8008/").unwrap()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(60 * 60)
}

/// How the rooms are mutated on the homeserver
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminBackend {
    /// Run an external administration command, like `synadm`, configured in
    /// the `admin_command` section
    #[default]
    Command,

    /// Call the Synapse admin API directly
    Api,
}

/// Configuration related to the Matrix homeserver
#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatrixConfig {
    /// The server name of the homeserver.
    #[serde(default = "default_homeserver")]
    pub homeserver: String,

    /// Which backend to use to purge and delete rooms
    #[serde(default)]
    pub backend: AdminBackend,

    /// The base URL of the homeserver's client API, used by the `api` backend
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Access token of a homeserver admin, used by the `api` backend
    pub secret: Option<String>,

    /// File containing the access token of a homeserver admin, used by the
    /// `api` backend
    #[schemars(with = "Option<String>")]
    pub secret_file: Option<Utf8PathBuf>,

    /// How often to poll the status of purges and deletions, in seconds
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_poll_interval")]
    #[schemars(with = "u64", range(min = 1))]
    pub poll_interval: Duration,

    /// How long to wait for a single purge or deletion to complete, in
    /// seconds
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_max_wait")]
    #[schemars(with = "u64", range(min = 1))]
    pub max_wait: Duration,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            homeserver: default_homeserver(),
            backend: AdminBackend::default(),
            endpoint: default_endpoint(),
            secret: None,
            secret_file: None,
            poll_interval: default_poll_interval(),
            max_wait: default_max_wait(),
        }
    }
}

impl ConfigurationSection for MatrixConfig {
    const PATH: Option<&'static str> = Some("matrix");

    fn validate(&self, _figment: &figment::Figment) -> Result<(), ConfigError> {
        if self.secret.is_some() && self.secret_file.is_some() {
            return Err("Cannot specify both `secret` and `secret_file`".into());
        }

        if self.backend == AdminBackend::Api && self.secret.is_none() && self.secret_file.is_none()
        {
            return Err("The `api` backend needs either `secret` or `secret_file`".into());
        }

        if self.poll_interval.is_zero() {
            return Err("`poll_interval` must be at least one second".into());
        }

        Ok(())
    }
}

impl MatrixConfig {
    /// Returns the admin access token, reading it from `secret_file` if
    /// needed
    ///
    /// # Errors
    ///
    /// Returns an error when the secret is missing or the file can't be read
    pub async fn secret(&self) -> Result<String, ConfigError> {
        if let Some(secret) = &self.secret {
            return Ok(secret.clone());
        }

        if let Some(path) = &self.secret_file {
            let secret = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("Failed to read the admin token from {path}: {e}"))?;
            return Ok(secret.trim().to_owned());
        }

        Err("No admin access token configured in the `matrix` section".into())
    }
}
