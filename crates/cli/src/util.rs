// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use figment::Figment;
use janitor_config::{
    AdminBackend, AdminCommandConfig, ConfigurationSectionExt, DatabaseConfig, MatrixConfig,
};
use janitor_matrix::{DryRunConnection, RoomAdminConnection};
use janitor_matrix_synapse::{OptionalArgs, SynapseCommandConnection, SynapseConnection};
use janitor_synapse_reader::checks::synapse_database_check;
use janitor_tasks::DispatchMode;
use sqlx::{ConnectOptions, PgConnection, postgres::PgConnectOptions};
use tracing::{info, log::LevelFilter, warn};

fn database_connect_options_from_config(
    config: &DatabaseConfig,
) -> Result<PgConnectOptions, anyhow::Error> {
    let options = if let Some(uri) = config.uri.as_deref() {
        uri.parse()
            .context("could not parse database connection string")?
    } else {
        let mut opts = PgConnectOptions::new().application_name("synapse-janitor");

        if let Some(host) = config.host.as_deref() {
            opts = opts.host(host);
        }

        if let Some(port) = config.port {
            opts = opts.port(port);
        }

        if let Some(socket) = config.socket.as_deref() {
            opts = opts.socket(socket);
        }

        if let Some(username) = config.username.as_deref() {
            opts = opts.username(username);
        }

        if let Some(password) = config.password.as_deref() {
            opts = opts.password(password);
        }

        if let Some(database) = config.database.as_deref() {
            opts = opts.database(database);
        }

        opts
    };

    let options = match (config.ssl_ca.as_deref(), config.ssl_ca_file.as_deref()) {
        (None, None) => options,
        (Some(pem), None) => options.ssl_root_cert_from_pem(pem.as_bytes().to_owned()),
        (None, Some(path)) => options.ssl_root_cert(path),
        (Some(_), Some(_)) => {
            anyhow::bail!("invalid database configuration: both `ssl_ca` and `ssl_ca_file` are set")
        }
    };

    let options = match &config.ssl_mode {
        Some(ssl_mode) => {
            let ssl_mode = match ssl_mode {
                janitor_config::PgSslMode::Disable => sqlx::postgres::PgSslMode::Disable,
                janitor_config::PgSslMode::Allow => sqlx::postgres::PgSslMode::Allow,
                janitor_config::PgSslMode::Prefer => sqlx::postgres::PgSslMode::Prefer,
                janitor_config::PgSslMode::Require => sqlx::postgres::PgSslMode::Require,
                janitor_config::PgSslMode::VerifyCa => sqlx::postgres::PgSslMode::VerifyCa,
                janitor_config::PgSslMode::VerifyFull => sqlx::postgres::PgSslMode::VerifyFull,
            };

            options.ssl_mode(ssl_mode)
        }
        None => options,
    };

    // Counting the events of a busy homeserver is slow, so only statements
    // slower than a minute are worth a warning
    let options = options
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(60));

    Ok(options)
}

/// Create a single database connection from the configuration
#[tracing::instrument(name = "db.connect", skip_all)]
pub async fn database_connection_from_config(
    config: &DatabaseConfig,
) -> Result<PgConnection, anyhow::Error> {
    let options = database_connect_options_from_config(config)?;
    tokio::time::timeout(config.connect_timeout, options.connect())
        .await
        .context("timed out connecting to the database")?
        .context("could not connect to the database")
}

/// Check that the database looks like a Synapse database the room lists can
/// be generated from
#[tracing::instrument(name = "db.check", skip_all)]
pub async fn check_synapse_database(conn: &mut PgConnection) -> Result<(), anyhow::Error> {
    let (warnings, errors) = synapse_database_check(conn)
        .await
        .context("could not check the Synapse database")?;

    for warning in &warnings {
        warn!("{warning}");
    }

    if let Some(first) = errors.first() {
        for error in &errors {
            tracing::error!("{error}");
        }
        anyhow::bail!("the Synapse database is not usable: {first}");
    }

    Ok(())
}

/// Create the connection the jobs act through.
///
/// In dry-run mode, nothing talking to the homeserver is created, so that
/// neither credentials nor the admin command are needed.
pub async fn room_admin_connection_from_config(
    figment: &Figment,
    mode: DispatchMode,
) -> anyhow::Result<Arc<dyn RoomAdminConnection>> {
    if mode == DispatchMode::DryRun {
        return Ok(Arc::new(DryRunConnection::new()));
    }

    let matrix = MatrixConfig::extract_or_default(figment)
        .map_err(anyhow::Error::from_boxed)
        .context("invalid `matrix` configuration")?;

    let connection: Arc<dyn RoomAdminConnection> = match matrix.backend {
        AdminBackend::Api => {
            let access_token = matrix
                .secret()
                .await
                .map_err(anyhow::Error::from_boxed)
                .context("could not load the admin access token")?;

            Arc::new(
                SynapseConnection::new(
                    matrix.homeserver.clone(),
                    matrix.endpoint.clone(),
                    access_token,
                    janitor_http::reqwest_client(),
                )
                .with_polling(matrix.poll_interval, matrix.max_wait),
            )
        }

        AdminBackend::Command => {
            let command = AdminCommandConfig::extract_or_default(figment)
                .map_err(anyhow::Error::from_boxed)
                .context("invalid `admin_command` configuration")?;

            Arc::new(
                SynapseCommandConnection::new(
                    command.program,
                    command.purge_args,
                    command.delete_args,
                )
                .with_optional_args(OptionalArgs {
                    delete_local_events: command.delete_local_events_args,
                    block: command.block_args,
                    no_purge: command.no_purge_args,
                    message: command.message_args,
                })
                .with_confirmation(command.confirmation)
                .with_timeout(command.timeout),
            )
        }
    };

    info!(
        backend = connection.backend(),
        homeserver = %matrix.homeserver,
        "Acting on the homeserver"
    );

    Ok(connection)
}
