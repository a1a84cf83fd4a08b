// Copyright 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

use crate::{ConfigError, ConfigurationSection, schema::ArgumentTemplate};

const ROOM_ID_PLACEHOLDER: &str = "{room_id}";
const MESSAGE_PLACEHOLDER: &str = "{message}";

fn default_program() -> String {
    "synadm".to_owned()
}

fn default_purge_args() -> Vec<String> {
    ["history", "purge", "--before-days", "{days}", ROOM_ID_PLACEHOLDER]
        .map(ToOwned::to_owned)
        .to_vec()
}

fn default_delete_args() -> Vec<String> {
    ["room", "delete", ROOM_ID_PLACEHOLDER]
        .map(ToOwned::to_owned)
        .to_vec()
}

fn default_delete_local_events_args() -> Vec<String> {
    vec!["--delete-local".to_owned()]
}

fn default_block_args() -> Vec<String> {
    vec!["--block".to_owned()]
}

fn default_no_purge_args() -> Vec<String> {
    vec!["--no-purge".to_owned()]
}

fn default_message_args() -> Vec<String> {
    ["--message", MESSAGE_PLACEHOLDER]
        .map(ToOwned::to_owned)
        .to_vec()
}

fn default_confirmation() -> String {
    "y".to_owned()
}

fn default_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

/// External administration command used by the `command` backend
///
/// The command is run once per room. Its interactive confirmation prompt is
/// answered by writing `confirmation` to its standard input, and its exit
/// status tells whether the action succeeded.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AdminCommandConfig {
    /// Program to run, looked up in `PATH`
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments used to purge the history of a room
    #[serde(default = "default_purge_args")]
    #[schemars(with = "Vec<ArgumentTemplate>")]
    pub purge_args: Vec<String>,

    /// Arguments used to delete a room
    #[serde(default = "default_delete_args")]
    #[schemars(with = "Vec<ArgumentTemplate>")]
    pub delete_args: Vec<String>,

    /// Arguments appended to `purge_args` when events sent by local users
    /// should be purged as well
    #[serde(default = "default_delete_local_events_args")]
    pub delete_local_events_args: Vec<String>,

    /// Arguments appended to `delete_args` to block the room
    #[serde(default = "default_block_args")]
    pub block_args: Vec<String>,

    /// Arguments appended to `delete_args` to keep the room in the database
    #[serde(default = "default_no_purge_args")]
    pub no_purge_args: Vec<String>,

    /// Arguments appended to `delete_args` when a message is sent to the
    /// local members. `{message}` is replaced by the message
    #[serde(default = "default_message_args")]
    pub message_args: Vec<String>,

    /// Line written to the standard input of the command to confirm the
    /// action
    #[serde(default = "default_confirmation")]
    pub confirmation: String,

    /// Maximum time a single command may run, in seconds. The command is
    /// killed after that.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    #[schemars(with = "u64", range(min = 1))]
    pub timeout: Duration,
}

impl Default for AdminCommandConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            purge_args: default_purge_args(),
            delete_args: default_delete_args(),
            delete_local_events_args: default_delete_local_events_args(),
            block_args: default_block_args(),
            no_purge_args: default_no_purge_args(),
            message_args: default_message_args(),
            confirmation: default_confirmation(),
            timeout: default_timeout(),
        }
    }
}

impl ConfigurationSection for AdminCommandConfig {
    const PATH: Option<&'static str> = Some("admin_command");

    fn validate(&self, _figment: &figment::Figment) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err("`admin_command.program` must not be empty".into());
        }

        for (name, args) in [
            ("purge_args", &self.purge_args),
            ("delete_args", &self.delete_args),
        ] {
            if !args.iter().any(|arg| arg.contains(ROOM_ID_PLACEHOLDER)) {
                return Err(format!(
                    "`admin_command.{name}` must contain the {ROOM_ID_PLACEHOLDER} placeholder"
                )
                .into());
            }
        }

        if !self.message_args.is_empty()
            && !self
                .message_args
                .iter()
                .any(|arg| arg.contains(MESSAGE_PLACEHOLDER))
        {
            return Err(format!(
                "`admin_command.message_args` must contain the {MESSAGE_PLACEHOLDER} placeholder"
            )
            .into());
        }

        if self.timeout.is_zero() {
            return Err("`admin_command.timeout` must be at least one second".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Format, Yaml},
    };

    use super::*;
    use crate::ConfigurationSectionExt;

    #[test]
    fn defaults_target_synadm() {
        let figment = Figment::new();
        let config = AdminCommandConfig::extract_or_default(&figment).unwrap();
        assert_eq!(config.program, "synadm");
        assert_eq!(
            config.purge_args,
            ["history", "purge", "--before-days", "{days}", "{room_id}"]
        );
        assert_eq!(config.delete_args, ["room", "delete", "{room_id}"]);
        assert_eq!(config.delete_local_events_args, ["--delete-local"]);
        assert_eq!(config.block_args, ["--block"]);
        assert_eq!(config.no_purge_args, ["--no-purge"]);
        assert_eq!(config.message_args, ["--message", "{message}"]);
        assert_eq!(config.confirmation, "y");
    }

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                    admin_command:
                      program: /usr/local/bin/synadm
                      delete_args: ["-c", "/etc/synadm.yaml", "room", "delete", "{room_id}"]
                      timeout: 120
                "#,
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = AdminCommandConfig::extract(&figment).map_err(|e| e.to_string())?;

            assert_eq!(config.program, "/usr/local/bin/synadm");
            assert_eq!(config.delete_args.len(), 5);
            assert_eq!(config.purge_args, default_purge_args());
            assert_eq!(config.timeout, Duration::from_secs(120));

            Ok(())
        });
    }

    #[test]
    fn reject_args_without_room_id() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                    admin_command:
                      delete_args: ["room", "delete"]
                "#,
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let error = AdminCommandConfig::extract(&figment).unwrap_err();
            assert!(error.to_string().contains("delete_args"));

            Ok(())
        });
    }

    #[test]
    fn optional_args_can_be_disabled() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                    admin_command:
                      block_args: []
                      message_args: ["--reason={message}"]
                "#,
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = AdminCommandConfig::extract(&figment).map_err(|e| e.to_string())?;
            assert!(config.block_args.is_empty());
            assert_eq!(config.message_args, ["--reason={message}"]);
            assert_eq!(config.no_purge_args, ["--no-purge"]);

            Ok(())
        });
    }

    #[test]
    fn reject_message_args_without_message() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                    admin_command:
                      message_args: ["--message"]
                "#,
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let error = AdminCommandConfig::extract(&figment).unwrap_err();
            assert!(error.to_string().contains("message_args"));

            Ok(())
        });
    }
}
