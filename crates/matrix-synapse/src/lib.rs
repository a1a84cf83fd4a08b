// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use anyhow::{Context as _, bail};
use http::Method;
use janitor_http::RequestBuilderExt as _;
use janitor_matrix::{DeleteRoomRequest, PurgeHistoryRequest, RoomAdminConnection, RoomId};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::error::{M_NOT_FOUND, SynapseResponseExt as _};

mod command;
mod error;

pub use self::command::{CommandError, OptionalArgs, SynapseCommandConnection};

/// State of a background task on Synapse, as reported by the status
/// endpoints of the purge and delete APIs
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum TaskStatus {
    Scheduled,
    Active,
    Complete,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: TaskStatus,
    error: Option<String>,
}

/// Talks to the Synapse admin API
#[derive(Clone)]
pub struct SynapseConnection {
    homeserver: String,
    endpoint: Url,
    access_token: String,
    http_client: reqwest::Client,
    poll_interval: Duration,
    max_wait: Duration,
}

impl SynapseConnection {
    #[must_use]
    pub fn new(
        homeserver: String,
        endpoint: Url,
        access_token: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            homeserver,
            endpoint,
            access_token,
            http_client,
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(60 * 60),
        }
    }

    /// Set how often background tasks are polled, and for how long at most
    #[must_use]
    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    fn builder(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(
                method,
                self.endpoint
                    .join(url)
                    .map(String::from)
                    .unwrap_or_default(),
            )
            .bearer_auth(&self.access_token)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.builder(Method::POST, url)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.builder(Method::GET, url)
    }

    fn delete(&self, url: &str) -> reqwest::RequestBuilder {
        self.builder(Method::DELETE, url)
    }

    /// Poll a status endpoint until the task it reports on is over
    async fn wait_for_task(&self, url: &str, task: &str) -> Result<(), anyhow::Error> {
        let deadline = Instant::now() + self.max_wait;

        loop {
            let response = self
                .get(url)
                .send_traced()
                .await
                .with_context(|| format!("Failed to query the status of the {task}"))?;

            let response = response.error_for_synapse_error().await.with_context(|| {
                format!("Unexpected HTTP response while querying the status of the {task}")
            })?;

            let body: StatusResponse = response.json().await.with_context(|| {
                format!("Failed to deserialize the status of the {task}")
            })?;

            match body.status {
                TaskStatus::Complete => return Ok(()),
                TaskStatus::Failed => bail!(
                    "The {task} failed on the homeserver: {}",
                    body.error.as_deref().unwrap_or("no reason given")
                ),
                TaskStatus::Scheduled | TaskStatus::Active | TaskStatus::Unknown => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                bail!(
                    "The {task} is still running after {}s, giving up waiting for it",
                    self.max_wait.as_secs()
                );
            }

            debug!(status = ?body.status, "Waiting for the {task} to finish");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait::async_trait]
impl RoomAdminConnection for SynapseConnection {
    fn backend(&self) -> &'static str {
        "api"
    }

    #[tracing::instrument(
        name = "homeserver.purge_history",
        skip_all,
        fields(
            matrix.homeserver = self.homeserver,
            matrix.room_id = %room_id,
            purge_up_to = %request.purge_up_to,
        ),
        err(Debug),
    )]
    async fn purge_history(
        &self,
        room_id: &RoomId,
        request: &PurgeHistoryRequest,
    ) -> Result<(), anyhow::Error> {
        #[derive(Serialize)]
        struct Request {
            delete_local_events: bool,
            purge_up_to_ts: i64,
        }

        #[derive(Deserialize)]
        struct Response {
            purge_id: String,
        }

        let body = Request {
            delete_local_events: request.delete_local_events,
            purge_up_to_ts: request.purge_up_to.timestamp_millis(),
        };

        let encoded_room_id = urlencoding::encode(room_id.as_str());
        let response = self
            .post(&format!("_synapse/admin/v1/purge_history/{encoded_room_id}"))
            .json(&body)
            .send_traced()
            .await
            .context("Failed to request a history purge from Synapse")?;

        let response = match response.error_for_synapse_error().await {
            Ok(response) => response,
            Err(err) if err.errcode() == Some(M_NOT_FOUND) => {
                info!(
                    error = &err as &dyn std::error::Error,
                    "Nothing to purge in this room"
                );
                return Ok(());
            }
            Err(err) => {
                return Err(err)
                    .context("Unexpected HTTP response while requesting a history purge");
            }
        };

        let Response { purge_id } = response
            .json()
            .await
            .context("Failed to deserialize the response of the history purge request")?;

        let encoded_purge_id = urlencoding::encode(&purge_id);
        self.wait_for_task(
            &format!("_synapse/admin/v1/purge_history_status/{encoded_purge_id}"),
            "history purge",
        )
        .await?;

        info!(%purge_id, "History purged");
        Ok(())
    }

    #[tracing::instrument(
        name = "homeserver.delete_room",
        skip_all,
        fields(
            matrix.homeserver = self.homeserver,
            matrix.room_id = %room_id,
        ),
        err(Debug),
    )]
    async fn delete_room(
        &self,
        room_id: &RoomId,
        request: &DeleteRoomRequest,
    ) -> Result<(), anyhow::Error> {
        #[derive(Serialize)]
        struct Request<'a> {
            purge: bool,
            block: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            message: Option<&'a str>,
        }

        #[derive(Deserialize)]
        struct Response {
            delete_id: String,
        }

        let body = Request {
            purge: request.purge,
            block: request.block,
            message: request.message.as_deref(),
        };

        let encoded_room_id = urlencoding::encode(room_id.as_str());
        let response = self
            .delete(&format!("_synapse/admin/v2/rooms/{encoded_room_id}"))
            .json(&body)
            .send_traced()
            .await
            .context("Failed to request a room deletion from Synapse")?;

        let response = response
            .error_for_synapse_error()
            .await
            .context("Unexpected HTTP response while requesting a room deletion")?;

        let Response { delete_id } = response
            .json()
            .await
            .context("Failed to deserialize the response of the room deletion request")?;

        let encoded_delete_id = urlencoding::encode(&delete_id);
        self.wait_for_task(
            &format!("_synapse/admin/v2/rooms/delete_status/{encoded_delete_id}"),
            "room deletion",
        )
        .await?;

        info!(%delete_id, "Room deleted");
        Ok(())
    }
}
