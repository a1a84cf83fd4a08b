// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::fmt::Display;

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Returned by the purge history API when the room has no event older than
/// the requested timestamp.
pub(crate) const M_NOT_FOUND: &str = "M_NOT_FOUND";

/// Body of an error response
/// Ref: <https://spec.matrix.org/v1.10/client-server-api/#standard-error-response>
#[derive(Debug, Deserialize)]
struct MatrixError {
    errcode: String,
    error: String,
}

/// An error response from the Synapse admin API
#[derive(Debug, Error)]
pub(crate) struct AdminApiError {
    status: StatusCode,
    matrix_error: Option<MatrixError>,

    #[source]
    source: reqwest::Error,
}

impl Display for AdminApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.matrix_error {
            Some(MatrixError { errcode, error }) => {
                write!(f, "HTTP {}, {errcode}: {error}", self.status)
            }
            None => write!(f, "HTTP {}", self.status),
        }
    }
}

impl AdminApiError {
    pub fn errcode(&self) -> Option<&str> {
        self.matrix_error.as_ref().map(|e| e.errcode.as_str())
    }
}

/// Turns error statuses of [`reqwest::Response`] into [`AdminApiError`]s
#[async_trait]
pub(crate) trait SynapseResponseExt: Sized {
    async fn error_for_synapse_error(self) -> Result<Self, AdminApiError>;
}

#[async_trait]
impl SynapseResponseExt for reqwest::Response {
    async fn error_for_synapse_error(self) -> Result<Self, AdminApiError> {
        match self.error_for_status_ref() {
            Ok(_response) => Ok(self),
            Err(source) => {
                let status = self.status();
                // The body may not be JSON, e.g. when a reverse proxy answers
                let matrix_error = self.json().await.ok();
                Err(AdminApiError {
                    status,
                    matrix_error,
                    source,
                })
            }
        }
    }
}
