// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Administration through an external command, like `synadm`

use std::{process::Stdio, time::Duration};

use janitor_matrix::{DeleteRoomRequest, PurgeHistoryRequest, RoomAdminConnection, RoomId};
use thiserror::Error;
use tokio::{io::AsyncWriteExt as _, process::Command};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for `{program}`")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` did not finish within {}s and was killed", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("`{program}` is not configured with arguments to {option}")]
    UnsupportedOption {
        program: String,
        option: &'static str,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Arguments appended to the command line for the options of a request
/// which differ from the command's own defaults.
///
/// An empty list means the command has no way to express the option, and
/// requests needing it fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionalArgs {
    pub delete_local_events: Vec<String>,
    pub block: Vec<String>,
    pub no_purge: Vec<String>,

    /// `{message}` is replaced by the message
    pub message: Vec<String>,
}

/// Runs an external command once per room.
///
/// Arguments are templates: `{room_id}`, `{days}` and `{purge_up_to_ts}`
/// (milliseconds since the epoch) are replaced before running the command.
/// The exit status of the command is the only thing telling whether the
/// action succeeded.
#[derive(Debug, Clone)]
pub struct SynapseCommandConnection {
    program: String,
    purge_args: Vec<String>,
    delete_args: Vec<String>,
    optional_args: OptionalArgs,
    confirmation: String,
    timeout: Duration,
}

fn expand(args: &[String], replacements: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            replacements
                .iter()
                .fold(arg.clone(), |arg, (placeholder, value)| {
                    arg.replace(placeholder, value)
                })
        })
        .collect()
}

impl SynapseCommandConnection {
    #[must_use]
    pub fn new(program: String, purge_args: Vec<String>, delete_args: Vec<String>) -> Self {
        Self {
            program,
            purge_args,
            delete_args,
            optional_args: OptionalArgs::default(),
            confirmation: "y".to_owned(),
            timeout: Duration::from_secs(60 * 60),
        }
    }

    /// Set the line written to the standard input of the command, answering
    /// its confirmation prompt
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: String) -> Self {
        self.confirmation = confirmation;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_optional_args(mut self, optional_args: OptionalArgs) -> Self {
        self.optional_args = optional_args;
        self
    }

    /// Append `extra` to `args` when `enabled`
    fn append_option(
        &self,
        args: &mut Vec<String>,
        enabled: bool,
        extra: &[String],
        option: &'static str,
    ) -> Result<(), CommandError> {
        if !enabled {
            return Ok(());
        }

        if extra.is_empty() {
            return Err(CommandError::UnsupportedOption {
                program: self.program.clone(),
                option,
            });
        }

        args.extend_from_slice(extra);
        Ok(())
    }

    fn purge_command_line(
        &self,
        room_id: &RoomId,
        request: &PurgeHistoryRequest,
    ) -> Result<Vec<String>, CommandError> {
        let mut args = self.purge_args.clone();
        self.append_option(
            &mut args,
            request.delete_local_events,
            &self.optional_args.delete_local_events,
            "purge events sent by local users",
        )?;

        let days = request.retention_days.to_string();
        let purge_up_to_ts = request.purge_up_to.timestamp_millis().to_string();
        Ok(expand(
            &args,
            &[
                ("{room_id}", room_id.as_str()),
                ("{days}", days.as_str()),
                ("{purge_up_to_ts}", purge_up_to_ts.as_str()),
            ],
        ))
    }

    fn delete_command_line(
        &self,
        room_id: &RoomId,
        request: &DeleteRoomRequest,
    ) -> Result<Vec<String>, CommandError> {
        let mut args = self.delete_args.clone();
        self.append_option(
            &mut args,
            request.block,
            &self.optional_args.block,
            "block rooms",
        )?;
        self.append_option(
            &mut args,
            !request.purge,
            &self.optional_args.no_purge,
            "keep deleted rooms in the database",
        )?;

        let message = request.message.as_deref().unwrap_or_default();
        self.append_option(
            &mut args,
            request.message.is_some(),
            &self.optional_args.message,
            "send a message to the members",
        )?;

        Ok(expand(
            &args,
            &[("{room_id}", room_id.as_str()), ("{message}", message)],
        ))
    }

    async fn run(&self, args: Vec<String>) -> Result<(), CommandError> {
        debug!(program = self.program, ?args, "Running command");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let answer = format!("{}\n", self.confirmation);
            // The command may exit without reading its input
            if let Err(error) = stdin.write_all(answer.as_bytes()).await {
                debug!(
                    error = &error as &dyn std::error::Error,
                    "Could not write the confirmation"
                );
            }
        }

        // Dropping the child on timeout kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_elapsed| CommandError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| CommandError::Wait {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim(), "Command output");
        }

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: stderr.trim().to_owned(),
            });
        }

        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "Command succeeded but wrote to stderr");
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl RoomAdminConnection for SynapseCommandConnection {
    fn backend(&self) -> &'static str {
        "command"
    }

    #[tracing::instrument(
        name = "command.purge_history",
        skip_all,
        fields(matrix.room_id = %room_id, program = self.program),
        err(Debug),
    )]
    async fn purge_history(
        &self,
        room_id: &RoomId,
        request: &PurgeHistoryRequest,
    ) -> Result<(), anyhow::Error> {
        let args = self.purge_command_line(room_id, request)?;
        self.run(args).await?;
        info!("History purged");
        Ok(())
    }

    #[tracing::instrument(
        name = "command.delete_room",
        skip_all,
        fields(matrix.room_id = %room_id, program = self.program),
        err(Debug),
    )]
    async fn delete_room(
        &self,
        room_id: &RoomId,
        request: &DeleteRoomRequest,
    ) -> Result<(), anyhow::Error> {
        let args = self.delete_command_line(room_id, request)?;

        self.run(args).await?;
        info!("Room deleted");
        Ok(())
    }
}
