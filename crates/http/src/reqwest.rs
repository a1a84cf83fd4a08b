// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use rustls_platform_verifier::ConfigVerifierExt;
use tokio::time::Instant;
use tracing::{Instrument, field::Empty};

static USER_AGENT: &str = concat!("synapse-janitor/", env!("CARGO_PKG_VERSION"));

/// Admin requests only start background tasks on the homeserver, they are
/// expected to answer quickly
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the [`reqwest::Client`] used to talk to the homeserver, verifying
/// certificates with the platform verifier
///
/// # Panics
///
/// Panics if the TLS configuration or the client can't be built
#[must_use]
pub fn client() -> reqwest::Client {
    // `use_preconfigured_tls` takes `Any`, so spell out the type
    let tls_config: rustls::ClientConfig =
        rustls::ClientConfig::with_platform_verifier().expect("failed to create TLS config");

    reqwest::Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .expect("failed to create HTTP client")
}

async fn send_traced(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, reqwest::Error> {
    let (client, request) = request.build_split();
    let request = request?;

    // Only the path: the query string could carry a token
    let span = tracing::info_span!(
        "http.client.request",
        "http.request.method" = %request.method(),
        "server.address" = request.url().host_str(),
        "url.path" = request.url().path(),
        "http.response.status_code" = Empty,
        "http.client.duration_ms" = Empty,
    );

    async move {
        let start = Instant::now();
        let result = client.execute(request).await;
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let span = tracing::Span::current();
        span.record("http.client.duration_ms", elapsed_ms);

        match &result {
            Ok(response) if response.status().is_server_error() => {
                span.record("http.response.status_code", response.status().as_u16());
                tracing::warn!(status = %response.status(), "Homeserver answered with a server error");
            }
            Ok(response) => {
                span.record("http.response.status_code", response.status().as_u16());
                tracing::debug!(status = %response.status(), "Got HTTP response");
            }
            Err(error) => {
                tracing::warn!(error = error as &dyn std::error::Error, "HTTP request failed");
            }
        }

        result
    }
    .instrument(span)
    .await
}

/// Extension trait to send a [`reqwest::RequestBuilder`] within a tracing
/// span
pub trait RequestBuilderExt {
    /// Send the request, recording its status and duration
    fn send_traced(self) -> impl Future<Output = Result<reqwest::Response, reqwest::Error>> + Send;
}

impl RequestBuilderExt for reqwest::RequestBuilder {
    fn send_traced(self) -> impl Future<Output = Result<reqwest::Response, reqwest::Error>> + Send {
        send_traced(self)
    }
}
